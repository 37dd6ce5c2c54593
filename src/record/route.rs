//! `RTM_NEWROUTE`/`RTM_DELROUTE` records.

use std::mem;

use crate::codec::attrs::AttrTable;
use crate::codec::TruncatedAttribute;

use super::{read_bytes, read_u32};

const RTA_MAX_INDEXED: usize = 24;

/// A routing table entry, as last reported by the kernel.
#[derive(Debug, Clone)]
pub struct Route {
    family: u8,
    dst_len: u8,
    src_len: u8,
    tos: u8,
    table: u8,
    protocol: u8,
    scope: u8,
    route_type: u8,
    flags: u32,
    attrs: AttrTable<RTA_MAX_INDEXED>,
}

impl Route {
    pub fn decode(payload: &[u8]) -> Option<(Self, Option<TruncatedAttribute>)> {
        let hdr_len = mem::size_of::<libc::rtmsg>();
        if payload.len() < hdr_len {
            return None;
        }
        let hdr = &payload[..hdr_len];
        let family = hdr[0];
        let dst_len = hdr[1];
        let src_len = hdr[2];
        let tos = hdr[3];
        let table = hdr[4];
        let protocol = hdr[5];
        let scope = hdr[6];
        let route_type = hdr[7];
        let flags = u32::from_ne_bytes(hdr[8..12].try_into().unwrap());

        let (attrs, err) = AttrTable::build(payload[hdr_len..].to_vec());
        Some((
            Route {
                family,
                dst_len,
                src_len,
                tos,
                table,
                protocol,
                scope,
                route_type,
                flags,
                attrs,
            },
            err,
        ))
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    pub fn dst_len(&self) -> u8 {
        self.dst_len
    }

    pub fn src_len(&self) -> u8 {
        self.src_len
    }

    /// `rtm_tos`: the type-of-service selector for policy routing; 0 for
    /// the common case of a ToS-independent route.
    pub fn tos(&self) -> u8 {
        self.tos
    }

    /// `rtm_table`, widened by `RTA_TABLE` when the legacy 8-bit field
    /// saturated (kernels use `RT_TABLE_COMPAT` plus the attribute for
    /// table ids above 255).
    pub fn table(&self) -> u32 {
        read_u32(self.attrs.get(libc::RTA_TABLE as u16)).unwrap_or(self.table as u32)
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn scope(&self) -> u8 {
        self.scope
    }

    pub fn route_type(&self) -> u8 {
        self.route_type
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn destination(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_DST as u16))
    }

    pub fn source(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_SRC as u16))
    }

    pub fn gateway(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_GATEWAY as u16))
    }

    pub fn pref_source(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_PREFSRC as u16))
    }

    pub fn output_ifindex(&self) -> Option<i32> {
        read_u32(self.attrs.get(libc::RTA_OIF as u16)).map(|v| v as i32)
    }

    pub fn input_ifindex(&self) -> Option<i32> {
        read_u32(self.attrs.get(libc::RTA_IIF as u16)).map(|v| v as i32)
    }

    pub fn priority(&self) -> Option<u32> {
        read_u32(self.attrs.get(libc::RTA_PRIORITY as u16))
    }

    /// Open Question 1 (SPEC_FULL §9): `RTA_METRICS` is in general a
    /// nested TLV chain (`RTAX_*` sub-attributes), but this crate follows
    /// the decided scalar reading and exposes only its first 4 bytes
    /// reinterpreted as a native-endian `u32`. Routes whose metrics
    /// attribute is genuinely nested with multiple sub-attributes will
    /// have this return the raw bytes of the first sub-attribute's TLV
    /// header plus payload, not a meaningful single metric; callers that
    /// need the individual `RTAX_*` values should walk
    /// [`Route::raw_attrs`] themselves.
    pub fn metrics_raw_u32(&self) -> Option<u32> {
        read_u32(self.attrs.get(libc::RTA_METRICS as u16))
    }

    /// `RTA_MULTIPATH`: raw `struct rtnexthop` chain for an ECMP route.
    /// Left unparsed (callers that need per-nexthop weights/gateways walk
    /// it themselves) since doing so correctly needs its own nested-TLV
    /// walker distinct from [`crate::codec::attrs::AttrIter`]'s flat one.
    pub fn multipath_raw(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_MULTIPATH as u16))
    }

    /// `RTA_CACHEINFO`: `struct rta_cacheinfo` (`rta_clntref`, `rta_lastuse`,
    /// `rta_expires`, `rta_error`, `rta_used`, plus an `id`/`ts`/`tsage`
    /// trailer on some kernels) — exposed as raw bytes rather than a typed
    /// struct since its shape has grown over kernel releases.
    pub fn cache_info_raw(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_CACHEINFO as u16))
    }

    /// `RTA_ENCAP`: nested lightweight-tunnel encapsulation parameters,
    /// keyed by the sibling `RTA_ENCAP_TYPE` attribute. Retained verbatim
    /// for the same reason as [`Route::multipath_raw`].
    pub fn encap_raw(&self) -> Option<&[u8]> {
        read_bytes(self.attrs.get(libc::RTA_ENCAP as u16))
    }

    pub fn encap_type(&self) -> Option<u16> {
        let bytes = self.attrs.get(libc::RTA_ENCAP_TYPE as u16)?;
        Some(u16::from_ne_bytes(bytes.get(0..2)?.try_into().ok()?))
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
    fn decodes_default_route() {
        let mut buf = vec![0u8; mem::size_of::<libc::rtmsg>()];
        buf[0] = libc::AF_INET as u8;
        buf[4] = libc::RT_TABLE_MAIN as u8;
        buf[5] = libc::RTPROT_STATIC as u8;
        buf[6] = libc::RT_SCOPE_UNIVERSE as u8;
        buf[7] = libc::RTN_UNICAST as u8;
        push_attr(&mut buf, libc::RTA_GATEWAY as u16, &[10, 0, 0, 1]);
        push_attr(&mut buf, libc::RTA_OIF as u16, &2u32.to_ne_bytes());

        let (route, err) = Route::decode(&buf).unwrap();
        assert!(err.is_none());
        assert_eq!(route.dst_len(), 0);
        assert_eq!(route.gateway(), Some(&[10, 0, 0, 1][..]));
        assert_eq!(route.output_ifindex(), Some(2));
        assert_eq!(route.table(), libc::RT_TABLE_MAIN as u32);
    }
}
