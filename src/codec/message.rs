//! Outer framing: walks a batch of bytes returned by one `recv` call on the
//! control socket and slices it into individual netlink messages.
//!
//! Each message is prefixed by a `struct nlmsghdr` (`libc::nlmsghdr`, 16
//! bytes), 4-byte aligned: read a small fixed header, compute where the
//! next record starts from its declared length, and stop cleanly at the
//! end of the buffer rather than panicking on a partial trailing record.

use std::mem;

use super::{align, TruncatedAttribute};

/// One framed, still-opaque netlink message.
#[derive(Debug, Clone, Copy)]
pub struct RawMessage<'a> {
    pub msg_type: u16,
    pub flags: u16,
    pub seq: u32,
    pub port_id: u32,
    /// The message body, i.e. everything after the 16-byte header and
    /// before the next message's alignment padding.
    pub payload: &'a [u8],
}

/// Kernel-recognized framing-level message types that the dispatcher must
/// special-case before handing a message to a per-record-kind decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Noop,
    Error,
    Done,
    Overrun,
    Record(u16),
}

impl RawMessage<'_> {
    pub fn frame_kind(&self) -> FrameKind {
        match self.msg_type as i32 {
            libc::NLMSG_NOOP => FrameKind::Noop,
            libc::NLMSG_ERROR => FrameKind::Error,
            libc::NLMSG_DONE => FrameKind::Done,
            libc::NLMSG_OVERRUN => FrameKind::Overrun,
            _ => FrameKind::Record(self.msg_type),
        }
    }

    /// For `FrameKind::Error`, the `errno` carried by the `nlmsgerr`
    /// payload. A value of 0 is a bare ACK, not a real error.
    pub fn error_code(&self) -> Option<i32> {
        if self.payload.len() < mem::size_of::<i32>() {
            return None;
        }
        Some(i32::from_ne_bytes(self.payload[0..4].try_into().unwrap()))
    }
}

const HEADER_LEN: usize = mem::size_of::<libc::nlmsghdr>();

/// Iterates the messages in one receive buffer.
///
/// Stops (without error) once fewer than `HEADER_LEN` bytes remain — that's
/// just the end of the batch, not malformed input. A message whose declared
/// `nlmsg_len` is too short to contain its own header, or which claims more
/// bytes than remain in the buffer, is reported via
/// [`TruncatedAttribute`]-shaped error so the caller can log how many
/// trailing bytes were abandoned (§4.1/§7: "remaining bytes logged, the
/// batch continues at the next message boundary" — for framing errors
/// there is no further boundary to resume at, so the whole batch ends).
pub struct MessageIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MessageIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        MessageIter { buf, pos: 0 }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<RawMessage<'a>, TruncatedAttribute>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.buf.len() - self.pos;
        if remaining < HEADER_LEN {
            return None;
        }

        let header_bytes = &self.buf[self.pos..self.pos + HEADER_LEN];
        let nlmsg_len = u32::from_ne_bytes(header_bytes[0..4].try_into().unwrap()) as usize;
        let msg_type = u16::from_ne_bytes(header_bytes[4..6].try_into().unwrap());
        let flags = u16::from_ne_bytes(header_bytes[6..8].try_into().unwrap());
        let seq = u32::from_ne_bytes(header_bytes[8..12].try_into().unwrap());
        let port_id = u32::from_ne_bytes(header_bytes[12..16].try_into().unwrap());

        if nlmsg_len < HEADER_LEN || nlmsg_len > remaining {
            // Poison the iterator: a framing-level truncation means we no
            // longer know where the next message would even start.
            let err = TruncatedAttribute {
                offset: self.pos,
                declared_len: nlmsg_len,
                remaining,
            };
            self.pos = self.buf.len();
            return Some(Err(err));
        }

        let payload = &self.buf[self.pos + HEADER_LEN..self.pos + nlmsg_len];
        self.pos += align(nlmsg_len);

        Some(Ok(RawMessage {
            msg_type,
            flags,
            seq,
            port_id,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_message(buf: &mut Vec<u8>, msg_type: u16, payload: &[u8]) {
        let nlmsg_len = (HEADER_LEN + payload.len()) as u32;
        buf.extend_from_slice(&nlmsg_len.to_ne_bytes());
        buf.extend_from_slice(&msg_type.to_ne_bytes());
        buf.extend_from_slice(&0u16.to_ne_bytes()); // flags
        buf.extend_from_slice(&0u32.to_ne_bytes()); // seq
        buf.extend_from_slice(&0u32.to_ne_bytes()); // port_id
        buf.extend_from_slice(payload);
        let padded = align(nlmsg_len as usize);
        buf.resize(buf.len() + (padded - nlmsg_len as usize), 0);
    }

    #[test]
    fn walks_multiple_messages_in_one_batch() {
        let mut buf = Vec::new();
        push_message(&mut buf, libc::RTM_NEWLINK as u16, &[1, 2, 3]);
        push_message(&mut buf, libc::NLMSG_DONE as u16, &[]);

        let msgs: Vec<_> = MessageIter::new(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].frame_kind(), FrameKind::Record(libc::RTM_NEWLINK as u16));
        assert_eq!(msgs[0].payload, &[1, 2, 3]);
        assert_eq!(msgs[1].frame_kind(), FrameKind::Done);
    }

    #[test]
    fn stops_cleanly_at_end_of_batch() {
        let buf = Vec::new();
        assert!(MessageIter::new(&buf).next().is_none());
    }

    #[test]
    fn truncated_header_is_reported() {
        let mut buf = Vec::new();
        push_message(&mut buf, libc::RTM_NEWLINK as u16, &[1, 2, 3, 4, 5, 6, 7, 8]);
        // Lie about the length so it claims more than the buffer holds.
        let bad_len: u32 = 9999;
        buf[0..4].copy_from_slice(&bad_len.to_ne_bytes());

        let mut iter = MessageIter::new(&buf);
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.declared_len, 9999);
        assert!(iter.next().is_none());
    }
}
