//! The record model: one type per rtnetlink object kind, each holding its
//! fixed-size kernel header verbatim plus an [`crate::codec::attrs::AttrTable`]
//! over its attribute block.
//!
//! §3: "A record is immutable once built; an update replaces the whole
//! record (including its attribute table) rather than mutating fields in
//! place," which is why every accessor here takes `&self` and there is no
//! `&mut` path back into a record once it has left the decoder.

mod addr;
mod link;
mod neigh;
mod route;

pub use addr::Addr;
pub use link::Link;
pub use neigh::Neigh;
pub use route::Route;

/// Reads a fixed-width numeric attribute, or `None` if absent or the
/// wrong length. Guards against short reads rather than indexing blindly.
pub(crate) fn read_u32(bytes: Option<&[u8]>) -> Option<u32> {
    let bytes = bytes?;
    Some(u32::from_ne_bytes(bytes.get(0..4)?.try_into().ok()?))
}

pub(crate) fn read_u8(bytes: Option<&[u8]>) -> Option<u8> {
    bytes?.first().copied()
}

/// A link-layer or L3 address attribute rendered as raw bytes; callers
/// decide how to format it (colon-hex for MACs, dotted-quad/hex-groups for
/// IPv4/IPv6) since the record model itself stays address-family-agnostic
/// per §3's "the store does not parse address families beyond what it
/// needs for indexing."
pub(crate) fn read_bytes(bytes: Option<&[u8]>) -> Option<&[u8]> {
    bytes
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn read_u32_rejects_short_buffers() {
        assert_eq!(read_u32(Some(&[1, 0, 0])), None);
        assert_eq!(read_u32(Some(&[1, 0, 0, 0])), Some(1));
        assert_eq!(read_u32(None), None);
    }
}
