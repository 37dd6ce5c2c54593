//! The object store: the in-memory mirror of kernel state, one table per
//! record kind, all built on top of the nonce/byte/count bookkeeping
//! described in §3.

pub(crate) mod kind_store;
mod link_store;
mod trie;

pub mod stats;

pub use kind_store::KindStore;
pub use link_store::LinkStore;
pub use stats::{Stats, StatsSample};

use std::sync::Arc;

use crate::record::{Addr, Neigh, Route};

/// Composite key for an address record: the owning link plus the address
/// family and the address bytes themselves (§3: "an address is identified
/// by the tuple the kernel itself uses to decide whether `RTM_NEWADDR`
/// replaces an existing entry or adds a new one").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddrKey {
    pub link_index: i32,
    pub family: u8,
    pub address: Vec<u8>,
}

impl AddrKey {
    pub fn of(addr: &Addr) -> Option<Self> {
        let address = addr.local().or_else(|| addr.address())?.to_vec();
        Some(AddrKey {
            link_index: addr.link_index(),
            family: addr.family(),
            address,
        })
    }
}

/// Composite key for a route: table id, destination prefix and the
/// output interface (multiple routes can share a destination via
/// different next hops/tables).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub table: u32,
    pub dst_len: u8,
    pub destination: Vec<u8>,
    pub output_ifindex: Option<i32>,
}

impl RouteKey {
    pub fn of(route: &Route) -> Self {
        RouteKey {
            table: route.table(),
            dst_len: route.dst_len(),
            destination: route.destination().unwrap_or(&[]).to_vec(),
            output_ifindex: route.output_ifindex(),
        }
    }
}

/// Composite key for a neighbor cache entry: the owning link plus the L3
/// address it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighKey {
    pub link_index: i32,
    pub destination: Vec<u8>,
}

impl NeighKey {
    pub fn of(neigh: &Neigh) -> Option<Self> {
        let destination = neigh.destination()?.to_vec();
        Some(NeighKey {
            link_index: neigh.link_index(),
            destination,
        })
    }
}

/// The full object store: one table per record kind plus the shared
/// stats block every table reports into.
pub struct Store {
    pub links: LinkStore,
    pub addrs: KindStore<AddrKey, Addr>,
    pub routes: KindStore<RouteKey, Route>,
    pub neighs: KindStore<NeighKey, Neigh>,
    pub stats: Arc<Stats>,
}

impl Store {
    pub fn new() -> Self {
        let stats = Arc::new(Stats::new());
        Store {
            links: LinkStore::new(Arc::clone(&stats)),
            addrs: KindStore::new(),
            routes: KindStore::new(),
            neighs: KindStore::new(),
            stats,
        }
    }

    /// Lifetime event counting happens once per dispatched message, in
    /// `engine::dispatch`, not here — these helpers only touch the
    /// current-count/byte/table bookkeeping, so a `notrack`'d kind (which
    /// never calls these) and a tracked one are counted identically.
    pub fn upsert_addr(&self, addr: Addr) -> Option<AddrKey> {
        let key = AddrKey::of(&addr)?;
        let (delta, is_new) = self.addrs.upsert(key.clone(), addr);
        self.stats.adjust_bytes(delta);
        if is_new {
            self.stats.adjust_current_addrs(1);
        }
        Some(key)
    }

    pub fn remove_addr(&self, key: &AddrKey) -> Option<Addr> {
        let (addr, size) = self.addrs.remove(key)?;
        self.stats.adjust_current_addrs(-1);
        self.stats.adjust_bytes(-(size as i64));
        Some(addr)
    }

    pub fn upsert_route(&self, route: Route) -> RouteKey {
        let key = RouteKey::of(&route);
        let (delta, is_new) = self.routes.upsert(key.clone(), route);
        self.stats.adjust_bytes(delta);
        if is_new {
            self.stats.adjust_current_routes(1);
        }
        key
    }

    pub fn remove_route(&self, key: &RouteKey) -> Option<Route> {
        let (route, size) = self.routes.remove(key)?;
        self.stats.adjust_current_routes(-1);
        self.stats.adjust_bytes(-(size as i64));
        Some(route)
    }

    pub fn upsert_neigh(&self, neigh: Neigh) -> Option<NeighKey> {
        let key = NeighKey::of(&neigh)?;
        let (delta, is_new) = self.neighs.upsert(key.clone(), neigh);
        self.stats.adjust_bytes(delta);
        if is_new {
            self.stats.adjust_current_neighs(1);
        }
        Some(key)
    }

    pub fn remove_neigh(&self, key: &NeighKey) -> Option<Neigh> {
        let (neigh, size) = self.neighs.remove(key)?;
        self.stats.adjust_current_neighs(-1);
        self.stats.adjust_bytes(-(size as i64));
        Some(neigh)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
