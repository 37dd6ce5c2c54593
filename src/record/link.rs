//! `RTM_NEWLINK`/`RTM_DELLINK` records: network interfaces.

use std::mem;

use crate::codec::attrs::AttrTable;
use crate::codec::TruncatedAttribute;

use super::{read_bytes, read_u32, read_u8};

/// Compiled-in maximum `IFLA_*` type this record indexes directly (§4.2's
/// "compiled-in maximum"). Chosen generously above every attribute this
/// crate reads by name; anything at or past it still round-trips through
/// the unknown-attribute fallback scan.
const IFLA_MAX_INDEXED: usize = 64;

/// A network interface, as last reported by the kernel.
#[derive(Debug, Clone)]
pub struct Link {
    index: i32,
    family: u8,
    link_type: u16,
    flags: u32,
    change_mask: u32,
    attrs: AttrTable<IFLA_MAX_INDEXED>,
}

impl Link {
    /// Decodes one `RTM_NEWLINK`/`RTM_DELLINK` payload: a fixed
    /// `struct ifinfomsg` header followed by a TLV chain of `IFLA_*`
    /// attributes.
    ///
    /// Returns the record plus, if the attribute chain was truncated, the
    /// point at which decoding stopped — the header-derived fields above
    /// are always valid even then, since they come before any TLV.
    pub fn decode(payload: &[u8]) -> Option<(Self, Option<TruncatedAttribute>)> {
        let hdr_len = mem::size_of::<libc::ifinfomsg>();
        if payload.len() < hdr_len {
            return None;
        }
        let hdr = &payload[..hdr_len];
        let family = hdr[0];
        let index = i32::from_ne_bytes(hdr[4..8].try_into().unwrap());
        let flags = u32::from_ne_bytes(hdr[8..12].try_into().unwrap());
        let change_mask = u32::from_ne_bytes(hdr[12..16].try_into().unwrap());
        let link_type = u16::from_ne_bytes(hdr[2..4].try_into().unwrap());

        let (attrs, err) = AttrTable::build(payload[hdr_len..].to_vec());
        Some((
            Link {
                index,
                family,
                link_type,
                flags,
                change_mask,
                attrs,
            },
            err,
        ))
    }

    /// `ifi_family`: almost always `AF_UNSPEC` for links (the family field
    /// is a holdover from the shared `rtnetlink` header shape; it carries
    /// real information for addresses and routes, not links).
    pub fn family(&self) -> u8 {
        self.family
    }

    /// Stable key for the by-index hash table. Never changes across an
    /// update; a renumbered interface shows up as a delete plus an insert.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Key for the by-name trie. `None` means the record had no
    /// `IFLA_IFNAME`, which the store treats as ineligible for name
    /// lookup (it still lives in the by-index table).
    pub fn name(&self) -> Option<&str> {
        let bytes = read_bytes(self.attrs.get(libc::IFLA_IFNAME as u16))?;
        std::str::from_utf8(trim_nul(bytes)).ok()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn is_up(&self) -> bool {
        self.flags & libc::IFF_UP as u32 != 0
    }

    pub fn is_running(&self) -> bool {
        self.flags & libc::IFF_RUNNING as u32 != 0
    }

    pub fn change_mask(&self) -> u32 {
        self.change_mask
    }

    /// `ifi_type`: the `ARPHRD_*` hardware/link type.
    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    pub fn mtu(&self) -> Option<u32> {
        read_u32(self.attrs.get(libc::IFLA_MTU as u16))
    }

    /// Link-layer address, raw bytes (e.g. 6 bytes for Ethernet). Callers
    /// format it however suits them; the record does not assume a length.
    pub fn address(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFLA_ADDRESS as u16))
    }

    pub fn broadcast(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFLA_BROADCAST as u16))
    }

    /// `IFLA_OPERSTATE`: one of the `IF_OPER_*` values (`UP`, `DOWN`,
    /// `UNKNOWN`, ...), or `None` if the kernel didn't report one.
    pub fn oper_state(&self) -> Option<u8> {
        read_u8(self.attrs.get(libc::IFLA_OPERSTATE as u16))
    }

    /// Open Question 3 (SPEC_FULL §9): "combined" hardware queue count is
    /// not a single kernel attribute; this crate surfaces
    /// `IFLA_NUM_TX_QUEUES` (the attribute actually present on every link
    /// that reports queue counts at all) and returns the documented `-1`
    /// sentinel, rather than `Option<u32>`, for links that don't.
    pub fn xdp_queue_count(&self) -> i32 {
        match read_u32(self.attrs.get(libc::IFLA_NUM_TX_QUEUES as u16)) {
            Some(n) => n as i32,
            None => -1,
        }
    }

    /// True if the decoded attribute chain contained at least one
    /// attribute type beyond the compiled-in indexed range. Those
    /// attributes are still retained in [`Link::raw_attrs`]; they are just
    /// not indexed by offset.
    pub fn has_unknown_attrs(&self) -> bool {
        self.attrs.has_unknown_attrs()
    }

    /// The full retained attribute block, unknown attributes included,
    /// for callers that need something this crate doesn't expose a typed
    /// accessor for.
    pub fn raw_attrs(&self) -> &[u8] {
        self.attrs.raw()
    }

    /// `MINIMAL`-flagged enumeration's per-record projection (§4.5/§6): a
    /// copy retaining only the fixed header and the interface name,
    /// dropping every other attribute (known or not) from the returned
    /// record's TLV buffer. Cheaper to produce and to copy out in bulk
    /// than a full [`Link::clone`], at the cost of every other attribute
    /// accessor returning `None` on the result.
    pub fn to_minimal(&self) -> Link {
        let mut buf = Vec::new();
        if let Some(name) = self.name() {
            let mut name_bytes = name.as_bytes().to_vec();
            name_bytes.push(0);
            let hdr_len = mem::size_of::<libc::rtattr>();
            let rta_len = (hdr_len + name_bytes.len()) as u16;
            buf.extend_from_slice(&rta_len.to_ne_bytes());
            buf.extend_from_slice(&(libc::IFLA_IFNAME as u16).to_ne_bytes());
            buf.extend_from_slice(&name_bytes);
            let padded = crate::codec::align(rta_len as usize);
            buf.resize(buf.len() + (padded - rta_len as usize), 0);
        }
        let (attrs, _) = AttrTable::build(buf);
        Link {
            index: self.index,
            family: self.family,
            link_type: self.link_type,
            flags: self.flags,
            change_mask: self.change_mask,
            attrs,
        }
    }
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(i) => &bytes[..i],
        None => bytes,
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

    fn ifinfomsg(index: i32, flags: u32) -> Vec<u8> {
        let mut buf = vec![0u8; mem::size_of::<libc::ifinfomsg>()];
        buf[0] = libc::AF_UNSPEC as u8;
        buf[2..4].copy_from_slice(&(libc::ARPHRD_ETHER as u16).to_ne_bytes());
        buf[4..8].copy_from_slice(&index.to_ne_bytes());
        buf[8..12].copy_from_slice(&flags.to_ne_bytes());
        buf[12..16].copy_from_slice(&0xffff_ffffu32.to_ne_bytes());
        buf
    }

    #[test]
    fn decodes_header_fields_and_name() {
        let mut payload = ifinfomsg(3, libc::IFF_UP as u32 | libc::IFF_RUNNING as u32);
        push_attr(&mut payload, libc::IFLA_IFNAME as u16, b"eth0\0");
        push_attr(&mut payload, libc::IFLA_MTU as u16, &1500u32.to_ne_bytes());

        let (link, err) = Link::decode(&payload).unwrap();
        assert!(err.is_none());
        assert_eq!(link.index(), 3);
        assert_eq!(link.name(), Some("eth0"));
        assert_eq!(link.mtu(), Some(1500));
        assert!(link.is_up());
        assert!(link.is_running());
    }

    #[test]
    fn missing_queue_count_is_sentinel() {
        let payload = ifinfomsg(1, 0);
        let (link, _) = Link::decode(&payload).unwrap();
        assert_eq!(link.xdp_queue_count(), -1);
    }

    #[test]
    fn rejects_payload_shorter_than_header() {
        assert!(Link::decode(&[0u8; 2]).is_none());
    }
}
