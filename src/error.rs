//! Error types for every fallible surface of the crate.
//!
//! One `thiserror`-derived enum per distinguishable failure class: each
//! variant names the specific thing that went wrong rather than carrying
//! a single opaque string.

use std::io;

use thiserror::Error;

/// Failures that can occur while bringing up a [`crate::NetMirror`].
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("failed to open the netlink control socket: {0}")]
    SocketOpen(#[source] io::Error),

    #[error("failed to bind the netlink control socket: {0}")]
    SocketBind(#[source] io::Error),

    #[error("failed to subscribe to multicast group {group}: {source}")]
    Subscribe {
        group: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn the {0} thread")]
    ThreadSpawn(&'static str, #[source] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Configuration validation failures, reported synchronously and without
/// side effects (no socket is opened, no thread is spawned).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("a curry was supplied for the {0} callback, but no callback was set")]
    CurryWithoutCallback(&'static str),

    #[error("tracking is disabled for every kind and no callback is configured; nothing to do")]
    NothingToTrackOrObserve,
}

/// Failures enqueuing a dump command onto the transmitter's ring.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum EnqueueError {
    #[error("the dump command queue is full")]
    QueueFull,

    #[error("the engine is shutting down and no longer accepts commands")]
    ShuttingDown,
}

/// Failures validating or executing an [`crate::enumerate::EnumerateOptions`] call.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum EnumerateError {
    #[error("the requested item limit is negative")]
    NegativeLimit,

    #[error("ABORT cannot be combined with any other enumeration flag")]
    AbortCombinedWithOtherFlags,

    #[error("ABORT requires an in-progress cursor")]
    AbortWithoutCursor,

    #[error("the cursor's saved bucket index is out of range for the current table")]
    CursorOutOfRange,

    #[error("the store was mutated since the cursor was issued (nonce mismatch)")]
    StoreMutated,

    #[error(
        "buffer too small: {required_items} items / {required_bytes} bytes required for an atomic enumeration"
    )]
    AtomicBufferTooSmall {
        required_items: usize,
        required_bytes: usize,
    },
}

/// Non-zero teardown result. Mirrors the C ABI's "destroy returns non-zero if
/// any teardown step failed" convention (§6), surfaced here as a real error
/// for callers that use [`crate::NetMirror::shutdown`] instead of relying on
/// `Drop`.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("the receiver thread panicked during shutdown")]
    ReceiverPanicked,

    #[error("the transmitter thread panicked during shutdown")]
    TransmitterPanicked,
}

/// A single malformed-message or kernel-reported-error event, handed to the
/// caller's diagnostic hook if one is configured. Never fatal to the stream
/// (§7: "the stream continues").
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A `NLMSG_ERROR` frame was received from the kernel.
    KernelError,
    /// The current message or TLV block was malformed and was abandoned.
    MalformedMessage,
    /// The receiver's blocking receive returned an unrecoverable error; the
    /// receiver thread is about to exit.
    ReceiverTerminal,
}
