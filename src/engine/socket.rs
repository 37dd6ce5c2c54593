//! Raw `AF_NETLINK` socket transport.
//!
//! Built directly on `libc` syscalls rather than a netlink-specific crate:
//! the wire format here is small and fixed, and a thin direct binding
//! keeps the framing code (`crate::codec`) the only place that actually
//! interprets bytes.

use std::io;
use std::mem;
use std::os::unix::io::RawFd;

/// One open netlink control socket, bound to `NETLINK_ROUTE` and
/// optionally subscribed to multicast groups.
pub struct NetlinkSocket {
    fd: RawFd,
}

/// `RTNLGRP_*` group numbers this crate subscribes to, converted to the
/// bit position `NETLINK_ADD_MEMBERSHIP` expects (the group number itself,
/// not a bitmask — `setsockopt(NETLINK_ADD_MEMBERSHIP)` takes the group id
/// directly).
pub const RTNLGRP_LINK: i32 = 1;
pub const RTNLGRP_IPV4_IFADDR: i32 = 5;
pub const RTNLGRP_IPV4_ROUTE: i32 = 7;
pub const RTNLGRP_IPV6_IFADDR: i32 = 9;
pub const RTNLGRP_IPV6_ROUTE: i32 = 11;
pub const RTNLGRP_NEIGH: i32 = 3;

impl NetlinkSocket {
    pub fn open() -> io::Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                libc::NETLINK_ROUTE,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(NetlinkSocket { fd })
    }

    /// Binds to the kernel-assigned port id (`nl_pid = 0`) with no
    /// multicast groups in the bind call itself; groups are joined
    /// individually afterwards via [`NetlinkSocket::join_group`] so a
    /// failed join for one group doesn't unwind the whole bind.
    pub fn bind(&self) -> io::Result<()> {
        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as u16;
        addr.nl_pid = 0;
        addr.nl_groups = 0;

        let ret = unsafe {
            libc::bind(
                self.fd,
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as u32,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn join_group(&self, group: i32) -> io::Result<()> {
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_NETLINK,
                libc::NETLINK_ADD_MEMBERSHIP,
                &group as *const i32 as *const libc::c_void,
                mem::size_of::<i32>() as u32,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::send(self.fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Blocking receive. A zero-length result means the peer end of a
    /// `SHUT_RD` shutdown was reached — the receiver thread treats that as
    /// the teardown signal, not a malformed empty message.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Half-closes the socket for reading, which unblocks a thread parked
    /// in [`NetlinkSocket::recv`] (§5: "closing the socket is the first
    /// teardown step, specifically so the receiver thread's blocking read
    /// returns instead of needing a poll timeout").
    pub fn shutdown_read(&self) -> io::Result<()> {
        let ret = unsafe { libc::shutdown(self.fd, libc::SHUT_RD) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for NetlinkSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

// SAFETY: the fd is never read/written concurrently without
// synchronization above the `NetlinkSocket` (the receiver owns recv, the
// transmitter owns send); sharing the handle across threads is just
// sharing the integer descriptor.
unsafe impl Send for NetlinkSocket {}
unsafe impl Sync for NetlinkSocket {}
