//! The transmitter thread: drains [`super::queue::CommandQueue`] and
//! turns each [`super::queue::Command`] into an outgoing `RTM_GET*` dump
//! request on the control socket.

use std::mem;
use std::sync::Arc;

use log::{debug, warn};

use crate::codec::align;

use super::queue::{Command, CommandQueue};
use super::socket::NetlinkSocket;

/// Builds one `NLM_F_REQUEST | NLM_F_DUMP` request: an `nlmsghdr` followed
/// by a generic `{family, pad[3]}` body (the same minimal body the kernel
/// accepts for `RTM_GETLINK`/`RTM_GETADDR`/`RTM_GETROUTE`/`RTM_GETNEIGH`
/// dumps — `struct rtgenmsg` in the kernel headers).
fn build_dump_request(msg_type: u16, seq: u32) -> Vec<u8> {
    const BODY_LEN: usize = 4; // rtgen_family (1 byte) + 3 bytes padding
    let hdr_len = mem::size_of::<libc::nlmsghdr>();
    let total = hdr_len + BODY_LEN;

    let mut buf = Vec::with_capacity(align(total));
    buf.extend_from_slice(&(total as u32).to_ne_bytes());
    buf.extend_from_slice(&msg_type.to_ne_bytes());
    let flags = (libc::NLM_F_REQUEST | libc::NLM_F_DUMP) as u16;
    buf.extend_from_slice(&flags.to_ne_bytes());
    buf.extend_from_slice(&seq.to_ne_bytes());
    buf.extend_from_slice(&0u32.to_ne_bytes()); // port_id, kernel fills in
    buf.push(libc::AF_UNSPEC as u8);
    buf.extend_from_slice(&[0, 0, 0]); // padding
    let padded = align(total);
    buf.resize(padded, 0);
    buf
}

fn msg_type_for(command: Command) -> u16 {
    match command {
        Command::DumpLinks => libc::RTM_GETLINK as u16,
        Command::DumpAddrs => libc::RTM_GETADDR as u16,
        Command::DumpRoutes => libc::RTM_GETROUTE as u16,
        Command::DumpNeighs => libc::RTM_GETNEIGH as u16,
    }
}

/// Runs until [`CommandQueue::wait_for_next`] returns `None` (shutdown).
pub fn run(socket: Arc<NetlinkSocket>, queue: Arc<CommandQueue>) {
    let mut seq: u32 = 1;
    while let Some(command) = queue.wait_for_next() {
        let request = build_dump_request(msg_type_for(command), seq);
        seq = seq.wrapping_add(1);
        if let Err(e) = socket.send(&request) {
            warn!("netmirror: failed to send {command:?} request: {e}");
            // The receiver will never see a NLMSG_DONE for a request that
            // was never sent; restore clear-to-send ourselves so the next
            // queued command isn't starved forever.
            queue.mark_clear_to_send();
            continue;
        }
        debug!("netmirror: sent {command:?} request (seq {seq})");
    }
}
