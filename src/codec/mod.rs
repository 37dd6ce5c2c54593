//! The wire codec: turns raw bytes off the netlink control socket into
//! framed messages (`message`) and, within a message, into an
//! attribute-offset index (`attrs`).
//!
//! Values are never interpreted here beyond what's needed to find the next
//! TLV — §4.1: "Payload values ... are not interpreted by the codec; they
//! are interpreted by accessor helpers that verify payload length at read
//! time."

pub mod attrs;
pub mod message;

/// 4-byte alignment used throughout netlink framing, for both message
/// headers (`NLMSG_ALIGNTO`) and attribute headers (`RTA_ALIGNTO`).
pub const NETLINK_ALIGNTO: usize = 4;

#[inline]
pub const fn align(len: usize) -> usize {
    (len + NETLINK_ALIGNTO - 1) & !(NETLINK_ALIGNTO - 1)
}

/// A TLV whose declared length runs past the end of its containing block.
/// §4.1: "A TLV whose payload declares a length exceeding the remaining
/// block is a hard error that aborts decoding of the current message."
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("attribute at offset {offset} declares length {declared_len} but only {remaining} bytes remain")]
pub struct TruncatedAttribute {
    pub offset: usize,
    pub declared_len: usize,
    pub remaining: usize,
}
