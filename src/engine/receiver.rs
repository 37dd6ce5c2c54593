//! The receiver thread: the only reader of the control socket, blocked in
//! `recv` except when decoding and dispatching whatever it just read.
//!
//! §5's teardown order depends on this thread reacting to
//! [`super::socket::NetlinkSocket::shutdown_read`] by exiting its loop
//! rather than being sent a separate stop signal — the half-close makes
//! the blocking `recv` return directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, trace, warn};

use crate::codec::message::{FrameKind, MessageIter};
use crate::config::Config;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::store::Store;

use super::dispatch;
use super::queue::CommandQueue;
use super::socket::NetlinkSocket;

const RECV_BUF_LEN: usize = 64 * 1024;

fn emit_diagnostic(config: &Config, kind: DiagnosticKind, message: String) {
    if let Some(hook) = &config.diagnostic_hook {
        hook(&Diagnostic { kind, message });
    }
}

/// Runs until the socket is shut down for reading or an unrecoverable
/// `recv` error occurs. `shutdown_requested` is checked so a deliberate
/// shutdown doesn't get logged as a surprise failure.
pub fn run(
    socket: Arc<NetlinkSocket>,
    queue: Arc<CommandQueue>,
    store: Arc<Store>,
    config: Arc<Config>,
    shutdown_requested: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; RECV_BUF_LEN];
    loop {
        let n = match socket.recv(&mut buf) {
            Ok(0) => {
                trace!("netmirror: receiver observed socket shutdown, exiting");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                if shutdown_requested.load(Ordering::Acquire) {
                    return;
                }
                error!("netmirror: receiver's recv failed, stopping: {e}");
                store.stats.record_netlink_error();
                emit_diagnostic(
                    &config,
                    DiagnosticKind::ReceiverTerminal,
                    format!("recv failed: {e}"),
                );
                // Unblock the transmitter so it doesn't wait forever for
                // an ack that will never arrive.
                shutdown_requested.store(true, Ordering::Release);
                queue.shutdown();
                return;
            }
        };

        for item in MessageIter::new(&buf[..n]) {
            let msg = match item {
                Ok(msg) => msg,
                Err(truncated) => {
                    warn!("netmirror: truncated message in batch: {truncated}");
                    store.stats.record_malformed_message();
                    emit_diagnostic(
                        &config,
                        DiagnosticKind::MalformedMessage,
                        truncated.to_string(),
                    );
                    break;
                }
            };

            match msg.frame_kind() {
                FrameKind::Noop => {}
                FrameKind::Done => queue.mark_clear_to_send(),
                FrameKind::Overrun => {
                    warn!("netmirror: kernel reported ENOBUFS-class overrun");
                    store.stats.record_netlink_error();
                    emit_diagnostic(
                        &config,
                        DiagnosticKind::KernelError,
                        "netlink socket overrun; events may have been lost".to_string(),
                    );
                }
                FrameKind::Error => {
                    let code = msg.error_code().unwrap_or(0);
                    if code != 0 {
                        store.stats.record_netlink_error();
                        emit_diagnostic(
                            &config,
                            DiagnosticKind::KernelError,
                            format!("kernel returned errno {code} for seq {}", msg.seq),
                        );
                    }
                    queue.mark_clear_to_send();
                }
                FrameKind::Record(msg_type) => {
                    dispatch_record(msg_type as i32, &msg, &store, &config);
                }
            }
        }
    }
}

fn dispatch_record(
    msg_type: i32,
    msg: &crate::codec::message::RawMessage,
    store: &Store,
    config: &Config,
) {
    if msg_type == libc::RTM_NEWLINK as i32 || msg_type == libc::RTM_DELLINK as i32 {
        dispatch::handle_link(msg, store, config);
    } else if msg_type == libc::RTM_NEWADDR as i32 || msg_type == libc::RTM_DELADDR as i32 {
        dispatch::handle_addr(msg, store, config);
    } else if msg_type == libc::RTM_NEWROUTE as i32 || msg_type == libc::RTM_DELROUTE as i32 {
        dispatch::handle_route(msg, store, config);
    } else if msg_type == libc::RTM_NEWNEIGH as i32 || msg_type == libc::RTM_DELNEIGH as i32 {
        dispatch::handle_neigh(msg, store, config);
    }
}
