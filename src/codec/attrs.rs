//! The attribute-offset index: a fixed-size array mapping `rta_type` to the
//! byte offset of that attribute's payload within a record's retained TLV
//! buffer, built once at decode time so later accessors are O(1).
//!
//! §4.1: "Attributes are indexed by walking the TLV chain once at decode
//! time and recording, for each attribute type up to a compiled-in maximum,
//! the offset of its payload... Offsets are stored 1-biased (0 means
//! absent) so a zero-initialized index needs no separate presence bitmap."
//! §4.2 gives the accessor protocol this module's [`AttrTable`] implements.

use std::mem;

use super::{align, TruncatedAttribute};

/// A decoded TLV: its kernel-assigned type, and the payload bytes (header
/// stripped, alignment padding excluded).
#[derive(Debug, Clone, Copy)]
pub struct Attr<'a> {
    pub rta_type: u16,
    pub payload: &'a [u8],
}

const RTA_HDRLEN: usize = mem::size_of::<libc::rtattr>();

/// Walks one TLV chain (a record's attribute block), yielding each
/// attribute in wire order. Grounded on the same truncation handling as
/// [`crate::codec::message::MessageIter`]: a declared length that overruns
/// the block is a hard error, not a resumable one.
pub struct AttrIter<'a> {
    buf: &'a [u8],
    pos: usize,
    base_offset: usize,
}

impl<'a> AttrIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        AttrIter {
            buf,
            pos: 0,
            base_offset: 0,
        }
    }

    /// Like [`AttrIter::new`], but reported [`TruncatedAttribute::offset`]
    /// values are relative to `base_offset` within some larger buffer
    /// (used when walking a nested attribute, e.g. `RTA_METRICS`' own TLV
    /// chain, so diagnostics point at the outer record).
    pub fn nested(buf: &'a [u8], base_offset: usize) -> Self {
        AttrIter {
            buf,
            pos: 0,
            base_offset,
        }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<Attr<'a>, TruncatedAttribute>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.buf.len() - self.pos;
        if remaining < RTA_HDRLEN {
            return None;
        }

        let header = &self.buf[self.pos..self.pos + RTA_HDRLEN];
        let rta_len = u16::from_ne_bytes(header[0..2].try_into().unwrap()) as usize;
        let rta_type = u16::from_ne_bytes(header[2..4].try_into().unwrap());

        if rta_len < RTA_HDRLEN || rta_len > remaining {
            let err = TruncatedAttribute {
                offset: self.base_offset + self.pos,
                declared_len: rta_len,
                remaining,
            };
            self.pos = self.buf.len();
            return Some(Err(err));
        }

        let payload = &self.buf[self.pos + RTA_HDRLEN..self.pos + rta_len];
        self.pos += align(rta_len);

        Some(Ok(Attr { rta_type, payload }))
    }
}

/// Strips the low 15 bits mask kernels sometimes set on `rta_type`
/// (`NLA_F_NESTED`/`NLA_F_NET_BYTEORDER`, both `0x8000`/`0x4000`) before
/// indexing, so a nested-flagged attribute still lands at its plain slot.
const RTA_TYPE_MASK: u16 = 0x3fff;

/// A decode-time attribute index over a record's retained TLV buffer.
///
/// `N` is the compiled-in maximum `rta_type` this record kind indexes
/// directly; types at or above `N` still get a payload (the buffer keeps
/// every attribute, known or not, per §4.1's "unknown attributes are
/// preserved verbatim"), but lookups for them fall back to a linear scan
/// gated by `has_unknown`.
#[derive(Debug, Clone)]
pub struct AttrTable<const N: usize> {
    /// 1-biased offsets into `buf`; 0 means absent.
    offsets: [u32; N],
    has_unknown: bool,
    buf: Vec<u8>,
}

impl<const N: usize> AttrTable<N> {
    /// Walks `buf` once, building the offset index. Returns the table and,
    /// for every attribute it could not decode (truncated TLV), the
    /// [`TruncatedAttribute`] describing where decoding stopped — decoding
    /// a record never fails outright on a bad trailing attribute, it just
    /// keeps whatever it already indexed (§4.1 edge cases: duplicate or
    /// malformed attributes degrade gracefully rather than rejecting the
    /// whole record).
    pub fn build(buf: Vec<u8>) -> (Self, Option<TruncatedAttribute>) {
        let mut offsets = [0u32; N];
        let mut has_unknown = false;
        let mut stop_err = None;

        for item in AttrIter::new(&buf) {
            match item {
                Ok(attr) => {
                    let masked = (attr.rta_type & RTA_TYPE_MASK) as usize;
                    // SAFETY-free: offset of `attr.payload` within `buf`.
                    let payload_offset = attr.payload.as_ptr() as usize - buf.as_ptr() as usize;
                    if masked < N {
                        // Last-write-wins on duplicates (§4.1 edge cases).
                        offsets[masked] = (payload_offset + 1) as u32;
                    } else {
                        has_unknown = true;
                    }
                }
                Err(e) => {
                    stop_err = Some(e);
                    break;
                }
            }
        }

        (
            AttrTable {
                offsets,
                has_unknown,
                buf,
            },
            stop_err,
        )
    }

    /// The full retained TLV buffer, unknown attributes included.
    pub fn raw(&self) -> &[u8] {
        &self.buf
    }

    /// §4.2's accessor protocol: negative or out-of-compiled-range lookups
    /// are always absent; in-range lookups consult the offset table; a
    /// miss there falls back to linear scan only if `has_unknown` was set
    /// during [`AttrTable::build`].
    pub fn get(&self, rta_type: u16) -> Option<&[u8]> {
        let masked = (rta_type & RTA_TYPE_MASK) as usize;
        if masked < N {
            let offset = self.offsets[masked];
            if offset != 0 {
                return self.slice_at((offset - 1) as usize);
            }
            if !self.has_unknown {
                return None;
            }
        }
        self.scan(rta_type)
    }

    fn slice_at(&self, payload_offset: usize) -> Option<&[u8]> {
        // Recover the length by re-reading the TLV header immediately
        // preceding the payload.
        let header_start = payload_offset.checked_sub(RTA_HDRLEN)?;
        let header = self.buf.get(header_start..header_start + 2)?;
        let rta_len = u16::from_ne_bytes(header.try_into().unwrap()) as usize;
        self.buf.get(payload_offset..header_start + rta_len)
    }

    fn scan(&self, rta_type: u16) -> Option<&[u8]> {
        for item in AttrIter::new(&self.buf) {
            match item {
                Ok(attr) if attr.rta_type == rta_type => return Some(attr.payload),
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        None
    }

    pub fn has_unknown_attrs(&self) -> bool {
        self.has_unknown
    }
}
