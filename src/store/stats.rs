//! Engine-wide atomic counters, returned to callers via
//! [`crate::NetMirror::sample_stats`].
//!
//! Plain `AtomicU64`/`AtomicI64` fields updated with `Relaxed` ordering
//! (these are diagnostic counters, not synchronization points — the
//! hashlock and per-kind mutexes are what actually order store
//! mutations) and a `sample()` method that snapshots them into an owned,
//! `Copy` struct.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// A point-in-time snapshot of [`Stats`]. Returned by value so callers
/// can hold it past the lifetime of the engine that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSample {
    pub netlink_errors: u64,
    pub malformed_messages: u64,
    pub user_callbacks_total: u64,
    pub lookup_shares: u64,
    pub lookup_copies: u64,
    pub lookup_failures: u64,
    /// Shares handed out for a record that was deleted from the store
    /// before the caller dropped its handle (§3: "a handle keeps the
    /// record alive past its deletion; such a record is a zombie").
    pub zombie_shares: u64,
    pub current_links: i64,
    pub current_addrs: i64,
    pub current_routes: i64,
    pub current_neighs: i64,
    pub lifetime_link_events: u64,
    pub lifetime_addr_events: u64,
    pub lifetime_route_events: u64,
    pub lifetime_neigh_events: u64,
    pub total_bytes: u64,
}

#[derive(Default)]
pub struct Stats {
    netlink_errors: AtomicU64,
    malformed_messages: AtomicU64,
    user_callbacks_total: AtomicU64,
    lookup_shares: AtomicU64,
    lookup_copies: AtomicU64,
    lookup_failures: AtomicU64,
    zombie_shares: AtomicU64,
    current_links: AtomicI64,
    current_addrs: AtomicI64,
    current_routes: AtomicI64,
    current_neighs: AtomicI64,
    lifetime_link_events: AtomicU64,
    lifetime_addr_events: AtomicU64,
    lifetime_route_events: AtomicU64,
    lifetime_neigh_events: AtomicU64,
    total_bytes: AtomicU64,
}

macro_rules! counter_inc {
    ($name:ident, $field:ident) => {
        pub fn $name(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl Stats {
    pub fn new() -> Self {
        Stats::default()
    }

    counter_inc!(record_netlink_error, netlink_errors);
    counter_inc!(record_malformed_message, malformed_messages);
    counter_inc!(record_user_callback, user_callbacks_total);
    counter_inc!(record_lookup_share, lookup_shares);
    counter_inc!(record_lookup_copy, lookup_copies);
    counter_inc!(record_lookup_failure, lookup_failures);
    counter_inc!(record_zombie_share, zombie_shares);
    counter_inc!(record_link_event, lifetime_link_events);
    counter_inc!(record_addr_event, lifetime_addr_events);
    counter_inc!(record_route_event, lifetime_route_events);
    counter_inc!(record_neigh_event, lifetime_neigh_events);

    pub fn adjust_current_links(&self, delta: i64) {
        self.current_links.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn adjust_current_addrs(&self, delta: i64) {
        self.current_addrs.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn adjust_current_routes(&self, delta: i64) {
        self.current_routes.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn adjust_current_neighs(&self, delta: i64) {
        self.current_neighs.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn adjust_bytes(&self, delta: i64) {
        if delta >= 0 {
            self.total_bytes.fetch_add(delta as u64, Ordering::Relaxed);
        } else {
            self.total_bytes.fetch_sub((-delta) as u64, Ordering::Relaxed);
        }
    }

    pub fn sample(&self) -> StatsSample {
        StatsSample {
            netlink_errors: self.netlink_errors.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            user_callbacks_total: self.user_callbacks_total.load(Ordering::Relaxed),
            lookup_shares: self.lookup_shares.load(Ordering::Relaxed),
            lookup_copies: self.lookup_copies.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            zombie_shares: self.zombie_shares.load(Ordering::Relaxed),
            current_links: self.current_links.load(Ordering::Relaxed),
            current_addrs: self.current_addrs.load(Ordering::Relaxed),
            current_routes: self.current_routes.load(Ordering::Relaxed),
            current_neighs: self.current_neighs.load(Ordering::Relaxed),
            lifetime_link_events: self.lifetime_link_events.load(Ordering::Relaxed),
            lifetime_addr_events: self.lifetime_addr_events.load(Ordering::Relaxed),
            lifetime_route_events: self.lifetime_route_events.load(Ordering::Relaxed),
            lifetime_neigh_events: self.lifetime_neigh_events.load(Ordering::Relaxed),
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
        }
    }
}
