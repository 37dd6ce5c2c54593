//! `RTM_NEWADDR`/`RTM_DELADDR` records: addresses assigned to an interface.

use std::mem;

use crate::codec::attrs::AttrTable;
use crate::codec::TruncatedAttribute;

use super::{read_bytes, read_u32};

const IFA_MAX_INDEXED: usize = 16;

/// `IFA_RT_PRIORITY`, added to the kernel's UAPI after the `libc` crate's
/// bindings were last regenerated for this target; the value is stable
/// across kernel releases so it's safe to hardcode.
const IFA_RT_PRIORITY: u16 = 9;

/// `struct ifa_cacheinfo`: preferred/valid lifetimes plus the two
/// timestamps the kernel stamps on `IFA_CACHEINFO`, all in centiseconds
/// since boot except the lifetimes (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrCacheInfo {
    pub preferred: u32,
    pub valid: u32,
    pub created_stamp: u32,
    pub updated_stamp: u32,
}

/// An address assigned to a link, as last reported by the kernel.
#[derive(Debug, Clone)]
pub struct Addr {
    family: u8,
    prefix_len: u8,
    flags: u8,
    scope: u8,
    link_index: i32,
    attrs: AttrTable<IFA_MAX_INDEXED>,
}

impl Addr {
    pub fn decode(payload: &[u8]) -> Option<(Self, Option<TruncatedAttribute>)> {
        let hdr_len = mem::size_of::<libc::ifaddrmsg>();
        if payload.len() < hdr_len {
            return None;
        }
        let hdr = &payload[..hdr_len];
        let family = hdr[0];
        let prefix_len = hdr[1];
        let flags = hdr[2];
        let scope = hdr[3];
        let link_index = u32::from_ne_bytes(hdr[4..8].try_into().unwrap()) as i32;

        let (attrs, err) = AttrTable::build(payload[hdr_len..].to_vec());
        Some((
            Addr {
                family,
                prefix_len,
                flags,
                scope,
                link_index,
                attrs,
            },
            err,
        ))
    }

    /// The owning link's `ifindex`. Part of this record's store key: the
    /// same address attribute on two links is two distinct records.
    pub fn link_index(&self) -> i32 {
        self.link_index
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn scope(&self) -> u8 {
        self.scope
    }

    /// `ifa_flags`: the fixed-header flags byte. `IFA_FLAGS` (see
    /// [`Addr::extended_flags`]) carries the same bits plus ones that
    /// don't fit in a `u8` and supersedes this field when present.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// `IFA_ADDRESS`: the raw family-sized address bytes (4 for IPv4, 16
    /// for IPv6). For a point-to-point link this is the remote address;
    /// see [`Addr::local`] for the local one.
    pub fn address(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFA_ADDRESS as u16))
    }

    /// `IFA_LOCAL`: the local address, when distinct from `IFA_ADDRESS`
    /// (point-to-point links); otherwise usually a duplicate of it.
    pub fn local(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFA_LOCAL as u16))
    }

    pub fn label(&self) -> Option<&str> {
        let bytes = read_bytes(self.attrs.get(libc::IFA_LABEL as u16))?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        std::str::from_utf8(&bytes[..end]).ok()
    }

    pub fn broadcast(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFA_BROADCAST as u16))
    }

    pub fn extended_flags(&self) -> Option<u32> {
        read_u32(self.attrs.get(libc::IFA_FLAGS as u16))
    }

    /// `IFA_ANYCAST`: present only for anycast addresses.
    pub fn anycast(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFA_ANYCAST as u16))
    }

    /// `IFA_MULTICAST`: present only for multicast addresses.
    pub fn multicast(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::IFA_MULTICAST as u16))
    }

    /// `IFA_RT_PRIORITY`: route metric used when the kernel auto-creates a
    /// connected route for this address.
    pub fn priority(&self) -> Option<u32> {
        read_u32(self.attrs.get(IFA_RT_PRIORITY))
    }

    /// `IFA_CACHEINFO`: present once the address has aged past creation;
    /// absent for a freshly added address, and `None` if the payload is
    /// the wrong size rather than simply missing (§4.2's length check).
    pub fn cache_info(&self) -> Option<AddrCacheInfo> {
        let bytes = self.attrs.get(libc::IFA_CACHEINFO as u16)?;
        if bytes.len() != 16 {
            return None;
        }
        Some(AddrCacheInfo {
            preferred: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            valid: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
            created_stamp: u32::from_ne_bytes(bytes[8..12].try_into().unwrap()),
            updated_stamp: u32::from_ne_bytes(bytes[12..16].try_into().unwrap()),
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
    fn decodes_ipv4_local_address() {
        let mut buf = vec![0u8; mem::size_of::<libc::ifaddrmsg>()];
        buf[0] = libc::AF_INET as u8;
        buf[1] = 24;
        buf[4..8].copy_from_slice(&2u32.to_ne_bytes());
        push_attr(&mut buf, libc::IFA_LOCAL as u16, &[192, 168, 1, 5]);
        push_attr(&mut buf, libc::IFA_LABEL as u16, b"eth0\0");

        let (addr, err) = Addr::decode(&buf).unwrap();
        assert!(err.is_none());
        assert_eq!(addr.link_index(), 2);
        assert_eq!(addr.prefix_len(), 24);
        assert_eq!(addr.local(), Some(&[192, 168, 1, 5][..]));
        assert_eq!(addr.label(), Some("eth0"));
    }
}
