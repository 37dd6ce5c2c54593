//! The event engine: owns the control socket and the two threads that
//! multiplex it (§4.3).

mod dispatch;
pub mod queue;
pub mod receiver;
pub mod socket;
mod transmitter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::error::{CreateError, EnqueueError, ShutdownError};
use crate::store::Store;

pub use queue::Command;
use queue::CommandQueue;
use socket::NetlinkSocket;

/// Owns the control socket, the command queue and the receiver/transmitter
/// threads. Dropping or [`Engine::shutdown`]ing it tears both threads down
/// in the order described in §5: close the socket for reading (unblocks
/// the receiver), join the receiver, then tell the transmitter to stop and
/// join it.
pub struct Engine {
    socket: Arc<NetlinkSocket>,
    queue: Arc<CommandQueue>,
    shutdown_requested: Arc<AtomicBool>,
    receiver_handle: Option<JoinHandle<()>>,
    transmitter_handle: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn start(config: Arc<Config>, store: Arc<Store>) -> Result<Self, CreateError> {
        let socket = NetlinkSocket::open().map_err(CreateError::SocketOpen)?;
        socket.bind().map_err(CreateError::SocketBind)?;

        for (track, group, name) in [
            (config.link.track, socket::RTNLGRP_LINK, "link"),
            (config.addr.track, socket::RTNLGRP_IPV4_IFADDR, "ipv4-ifaddr"),
            (config.addr.track, socket::RTNLGRP_IPV6_IFADDR, "ipv6-ifaddr"),
            (config.route.track, socket::RTNLGRP_IPV4_ROUTE, "ipv4-route"),
            (config.route.track, socket::RTNLGRP_IPV6_ROUTE, "ipv6-route"),
            (config.neigh.track, socket::RTNLGRP_NEIGH, "neigh"),
        ] {
            if !track {
                continue;
            }
            socket
                .join_group(group)
                .map_err(|source| CreateError::Subscribe { group: name, source })?;
        }

        let socket = Arc::new(socket);
        let queue = Arc::new(CommandQueue::new());
        let shutdown_requested = Arc::new(AtomicBool::new(false));

        let receiver_handle = {
            let socket = Arc::clone(&socket);
            let queue = Arc::clone(&queue);
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            let shutdown_requested = Arc::clone(&shutdown_requested);
            thread::Builder::new()
                .name("netmirror-rx".into())
                .spawn(move || receiver::run(socket, queue, store, config, shutdown_requested))
                .map_err(|e| CreateError::ThreadSpawn("receiver", e))?
        };

        let transmitter_handle = {
            let socket = Arc::clone(&socket);
            let queue = Arc::clone(&queue);
            thread::Builder::new()
                .name("netmirror-tx".into())
                .spawn(move || transmitter::run(socket, queue))
                .map_err(|e| CreateError::ThreadSpawn("transmitter", e))?
        };

        Ok(Engine {
            socket,
            queue,
            shutdown_requested,
            receiver_handle: Some(receiver_handle),
            transmitter_handle: Some(transmitter_handle),
        })
    }

    pub fn enqueue(&self, command: Command) -> Result<(), EnqueueError> {
        self.queue.enqueue(command)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Blocks until every enqueued dump has both been sent and had its
    /// kernel reply fully drained. Used by the BLOCK initial-events policy,
    /// which needs to know the dump actually completed, not just that the
    /// transmitter got around to sending it.
    pub fn wait_until_idle(&self) {
        self.queue.wait_until_idle();
    }

    /// Tears both threads down and reports whether either panicked.
    /// Idempotent: a second call after the handles have already been
    /// taken (e.g. via [`Drop`]) is a no-op that returns `Ok(())`.
    pub fn shutdown(&mut self) -> Result<(), ShutdownError> {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.socket.shutdown_read();

        let mut result = Ok(());
        if let Some(handle) = self.receiver_handle.take() {
            if handle.join().is_err() {
                result = Err(ShutdownError::ReceiverPanicked);
            }
        }

        self.queue.shutdown();
        if let Some(handle) = self.transmitter_handle.take() {
            if handle.join().is_err() && result.is_ok() {
                result = Err(ShutdownError::TransmitterPanicked);
            }
        }

        result
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Panics during an implicit, Drop-driven teardown are swallowed
        // (§5: "panics during teardown are caught, not propagated") since
        // there's no caller left to hand a `Result` to.
        let _ = self.shutdown();
    }
}
