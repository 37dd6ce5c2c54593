//! `RTM_NEWNEIGH`/`RTM_DELNEIGH` records: the ARP/neighbor-discovery cache.

use std::mem;

use crate::codec::attrs::AttrTable;
use crate::codec::TruncatedAttribute;

use super::{read_bytes, read_u32};

const NDA_MAX_INDEXED: usize = 16;

/// `struct nda_cacheinfo`: confirmation/use/update timestamps (centiseconds
/// since boot) plus the kernel's internal refcount for this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighCacheInfo {
    pub confirmed: u32,
    pub used: u32,
    pub updated: u32,
    pub refcnt: u32,
}

/// A neighbor cache entry, as last reported by the kernel.
#[derive(Debug, Clone)]
pub struct Neigh {
    family: u8,
    link_index: i32,
    state: u16,
    flags: u8,
    neigh_type: u8,
    attrs: AttrTable<NDA_MAX_INDEXED>,
}

impl Neigh {
    pub fn decode(payload: &[u8]) -> Option<(Self, Option<TruncatedAttribute>)> {
        let hdr_len = mem::size_of::<libc::ndmsg>();
        if payload.len() < hdr_len {
            return None;
        }
        let hdr = &payload[..hdr_len];
        let family = hdr[0];
        let link_index = i32::from_ne_bytes(hdr[4..8].try_into().unwrap());
        let state = u16::from_ne_bytes(hdr[8..10].try_into().unwrap());
        let flags = hdr[10];
        let neigh_type = hdr[11];

        let (attrs, err) = AttrTable::build(payload[hdr_len..].to_vec());
        Some((
            Neigh {
                family,
                link_index,
                state,
                flags,
                neigh_type,
                attrs,
            },
            err,
        ))
    }

    /// Part of the store key alongside [`Neigh::destination`]: the same
    /// L3 address learned on two links is two distinct entries.
    pub fn link_index(&self) -> i32 {
        self.link_index
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    /// `NUD_*` state bitmask (`NUD_REACHABLE`, `NUD_STALE`, `NUD_FAILED`, ...).
    pub fn state(&self) -> u16 {
        self.state
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn neigh_type(&self) -> u8 {
        self.neigh_type
    }

    pub fn is_reachable(&self) -> bool {
        self.state & libc::NUD_REACHABLE as u16 != 0
    }

    pub fn is_failed(&self) -> bool {
        self.state & libc::NUD_FAILED as u16 != 0
    }

    /// `NDA_DST`: the L3 address this cache entry resolves.
    pub fn destination(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::NDA_DST as u16))
    }

    /// `NDA_LLADDR`: the resolved link-layer address.
    pub fn link_layer_address(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::NDA_LLADDR as u16))
    }

    pub fn probes(&self) -> Option<u32> {
        read_u32(self.attrs.get(libc::NDA_PROBES as u16))
    }

    /// `NDA_CACHEINFO`: the cache statistics named in §3's data model.
    /// `None` if absent or the wrong size (§4.2's length check), not just
    /// if the attribute never appears.
    pub fn cache_info(&self) -> Option<NeighCacheInfo> {
        let bytes = self.attrs.get(libc::NDA_CACHEINFO as u16)?;
        if bytes.len() != 16 {
            return None;
        }
        Some(NeighCacheInfo {
            confirmed: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            used: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            updated: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            refcnt: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
        })
    }

    pub fn has_unknown_attrs(&self) -> bool {
        self.attrs.has_unknown_attrs()
    }

    pub fn raw_attrs(&self) -> &[u8] {
        self.attrs.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::align;

    fn push_attr(buf: &mut Vec<u8>, rta_type: u16, payload: &[u8]) {
        let hdr_len = mem::size_of::<libc::rtattr>();
        let rta_len = (hdr_len + payload.len()) as u16;
        buf.extend_from_slice(&rta_len.to_ne_bytes());
        buf.extend_from_slice(&rta_type.to_ne_bytes());
        buf.extend_from_slice(payload);
        let padded = align(rta_len as usize);
        buf.resize(buf.len() + (padded - rta_len as usize), 0);
    }

    #[test]
    fn decodes_reachable_entry() {
        let mut buf = vec![0u8; mem::size_of::<libc::ndmsg>()];
        buf[0] = libc::AF_INET as u8;
        buf[4..8].copy_from_slice(&3i32.to_ne_bytes());
        buf[8..10].copy_from_slice(&(libc::NUD_REACHABLE as u16).to_ne_bytes());
        push_attr(&mut buf, libc::NDA_DST as u16, &[192, 168, 1, 1]);
        push_attr(
            &mut buf,
            libc::NDA_LLADDR as u16,
            &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff],
        );

        let (neigh, err) = Neigh::decode(&buf).unwrap();
        assert!(err.is_none());
        assert_eq!(neigh.link_index(), 3);
        assert!(neigh.is_reachable());
        assert_eq!(neigh.destination(), Some(&[192, 168, 1, 1][..]));
        assert_eq!(
            neigh.link_layer_address(),
            Some(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff][..])
        );
    }
}
