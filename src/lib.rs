//! A live, indexed, thread-safe mirror of the Linux kernel's rtnetlink
//! state: links, addresses, routes and the neighbor (ARP/NDP) cache.
//!
//! [`NetMirror`] opens a netlink control socket, requests an initial dump
//! of whichever record kinds are configured for tracking, and then keeps
//! its in-memory [`store::Store`] up to date as the kernel reports
//! changes, for as long as the value is alive. Queries (`share_link`,
//! `enumerate`, ...) read the store directly and never touch the socket.

pub mod codec;
pub mod config;
pub mod enumerate;
mod engine;
pub mod error;
pub mod record;
mod store;

use std::sync::Arc;

pub use config::{Config, EventKind, InitialEventsPolicy};
pub use enumerate::{Cursor, EnumerateBatch, EnumerateOptions, KindBatch};
pub use error::{CreateError, Diagnostic, DiagnosticKind, EnqueueError, EnumerateError, ShutdownError};
pub use record::{Addr, Link, Neigh, Route};
pub use store::{AddrKey, NeighKey, RouteKey, StatsSample};

use engine::{Command, Engine};
use store::Store;

/// The live mirror. Construct with [`NetMirror::new`]; drop it (or call
/// [`NetMirror::shutdown`] for an explicit result) to tear down its
/// background threads.
pub struct NetMirror {
    engine: Engine,
    store: Arc<Store>,
}

impl NetMirror {
    /// Validates `config`, opens the control socket, subscribes to the
    /// multicast groups for every tracked kind, spawns the receiver and
    /// transmitter threads, and enqueues the initial dump requests.
    ///
    /// With [`InitialEventsPolicy::Block`], this call does not return
    /// until every enqueued dump has been fully drained by the receiver
    /// (observed via the dump queue becoming idle again).
    pub fn new(config: Config) -> Result<Self, CreateError> {
        config.validate()?;
        let config = Arc::new(config);
        let store = Arc::new(Store::new());

        let engine = Engine::start(Arc::clone(&config), Arc::clone(&store))?;

        if !matches!(config.initial_events, InitialEventsPolicy::None) {
            for (track, command) in [
                (config.link.track, Command::DumpLinks),
                (config.addr.track, Command::DumpAddrs),
                (config.route.track, Command::DumpRoutes),
                (config.neigh.track, Command::DumpNeighs),
            ] {
                if track {
                    // The queue was just created; enqueueing here cannot
                    // fail on capacity or shutdown.
                    engine.enqueue(command).expect("fresh queue accepts enqueue");
                }
            }

            if matches!(config.initial_events, InitialEventsPolicy::Block) {
                engine.wait_until_idle();
            }
        }

        Ok(NetMirror { engine, store })
    }

    /// Enqueues a fresh dump request for one record kind, re-synchronizing
    /// the store against the kernel even if no change events were missed
    /// (useful after a diagnosed overrun).
    pub fn refresh_links(&self) -> Result<(), EnqueueError> {
        self.engine.enqueue(Command::DumpLinks)
    }

    pub fn refresh_addrs(&self) -> Result<(), EnqueueError> {
        self.engine.enqueue(Command::DumpAddrs)
    }

    pub fn refresh_routes(&self) -> Result<(), EnqueueError> {
        self.engine.enqueue(Command::DumpRoutes)
    }

    pub fn refresh_neighs(&self) -> Result<(), EnqueueError> {
        self.engine.enqueue(Command::DumpNeighs)
    }

    /// A cheap, refcounted handle to the link at `index`, or `None` if no
    /// such link is currently tracked.
    pub fn share_link_by_index(&self, index: i32) -> Option<Arc<Link>> {
        let result = self.store.links.share_by_index(index);
        if result.is_some() {
            self.store.stats.record_lookup_share();
        } else {
            self.store.stats.record_lookup_failure();
        }
        result
    }

    pub fn share_link_by_name(&self, name: &str) -> Option<Arc<Link>> {
        let result = self.store.links.share_by_name(name);
        if result.is_some() {
            self.store.stats.record_lookup_share();
        } else {
            self.store.stats.record_lookup_failure();
        }
        result
    }

    /// A deep copy of the link at `index`, independent of the store.
    pub fn copy_link_by_index(&self, index: i32) -> Option<Link> {
        let result = self.store.links.copy_by_index(index);
        if result.is_some() {
            self.store.stats.record_lookup_copy();
        } else {
            self.store.stats.record_lookup_failure();
        }
        result
    }

    pub fn copy_link_by_name(&self, name: &str) -> Option<Link> {
        let result = self.store.links.copy_by_name(name);
        if result.is_some() {
            self.store.stats.record_lookup_copy();
        } else {
            self.store.stats.record_lookup_failure();
        }
        result
    }

    pub fn copy_addr(&self, key: &store::AddrKey) -> Option<Addr> {
        self.store.addrs.get(key)
    }

    pub fn copy_route(&self, key: &store::RouteKey) -> Option<Route> {
        self.store.routes.get(key)
    }

    pub fn copy_neigh(&self, key: &store::NeighKey) -> Option<Neigh> {
        self.store.neighs.get(key)
    }

    pub fn link_count(&self) -> usize {
        self.store.links.count()
    }

    pub fn addr_count(&self) -> usize {
        self.store.addrs.count()
    }

    pub fn route_count(&self) -> usize {
        self.store.routes.count()
    }

    pub fn neigh_count(&self) -> usize {
        self.store.neighs.count()
    }

    pub fn enumerate_links(
        &self,
        options: EnumerateOptions,
        cursor: Option<Cursor>,
    ) -> Result<EnumerateBatch, EnumerateError> {
        enumerate::enumerate(&self.store.links, options, cursor)
    }

    pub fn copy_addrs(&self) -> Vec<Addr> {
        self.store.addrs.snapshot()
    }

    pub fn copy_routes(&self) -> Vec<Route> {
        self.store.routes.snapshot()
    }

    pub fn copy_neighs(&self) -> Vec<Neigh> {
        self.store.neighs.snapshot()
    }

    /// Kind-scoped atomic/streaming enumeration over the address cache
    /// (§3[FULL]), with the same budget/cursor contract as
    /// [`NetMirror::enumerate_links`] minus the refcount semantics Addr
    /// never had.
    pub fn enumerate_addrs(
        &self,
        options: EnumerateOptions,
        cursor: Option<Cursor>,
    ) -> Result<KindBatch<Addr>, EnumerateError> {
        enumerate::enumerate_kind(&self.store.addrs, options, cursor)
    }

    pub fn enumerate_routes(
        &self,
        options: EnumerateOptions,
        cursor: Option<Cursor>,
    ) -> Result<KindBatch<Route>, EnumerateError> {
        enumerate::enumerate_kind(&self.store.routes, options, cursor)
    }

    pub fn enumerate_neighs(
        &self,
        options: EnumerateOptions,
        cursor: Option<Cursor>,
    ) -> Result<KindBatch<Neigh>, EnumerateError> {
        enumerate::enumerate_kind(&self.store.neighs, options, cursor)
    }

    pub fn sample_stats(&self) -> StatsSample {
        self.store.stats.sample()
    }

    /// Explicit teardown. Equivalent to dropping the value, except it
    /// reports whether either background thread panicked rather than
    /// swallowing that information.
    pub fn shutdown(mut self) -> Result<(), ShutdownError> {
        self.engine.shutdown()
    }
}
