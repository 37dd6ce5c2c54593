//! Configuration surface for [`crate::NetMirror::new`].
//!
//! A plain builder-style struct: public fields, a `Default` impl, and a
//! fallible validation step rather than a CLI parser — there is no `clap`
//! here, this crate has no CLI surface of its own (the CLI demo is an
//! external, out-of-scope collaborator per §1).

use std::sync::Arc;

use crate::error::ConfigError;
use crate::record::{Addr, Link, Neigh, Route};

/// What to do with the initial table dump issued at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialEventsPolicy {
    /// Return from [`crate::NetMirror::new`] as soon as the dump requests
    /// are enqueued; events arrive afterwards.
    #[default]
    Async,
    /// Return only after the transmitter has drained the dump queue and the
    /// receiver has observed clear-to-send after the last reply.
    Block,
    /// Do not enqueue any dump; only subscription-driven events are ever
    /// delivered.
    None,
}

/// Event kind passed to a per-record-kind callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The record was created or replaced.
    Mod,
    /// The record was removed.
    Del,
}

type LinkCallback = dyn Fn(&Link, EventKind) + Send + Sync;
type AddrCallback = dyn Fn(&Addr, EventKind) + Send + Sync;
type RouteCallback = dyn Fn(&Route, EventKind) + Send + Sync;
type NeighCallback = dyn Fn(&Neigh, EventKind) + Send + Sync;
type DiagnosticHook = dyn Fn(&crate::error::Diagnostic) + Send + Sync;

/// Per-kind tracking and callback configuration, plus the engine-wide
/// initial-events policy and diagnostic hook.
///
/// The C ABI's "opaque curry pointer" (§6) is not needed in Rust: a curry is
/// just whatever the closure captures. `Config` keeps the constraint it was
/// guarding against, though — [`Config::validate`] rejects a configuration
/// that is pointless (nothing tracked, nothing observed), corresponding to
/// "all-tracks-off with no callbacks is invalid". The "non-null curry
/// without a matching callback" constraint has no Rust equivalent (a
/// closure and its captures are inseparable), so it is satisfied vacuously;
/// [`ConfigError::CurryWithoutCallback`] is kept for API-compatibility with
/// callers translating a C-shaped configuration and is otherwise unused by
/// [`Config::validate`] itself.
#[derive(Default, Clone)]
pub struct Config {
    pub link: KindConfig<LinkCallback>,
    pub addr: KindConfig<AddrCallback>,
    pub route: KindConfig<RouteCallback>,
    pub neigh: KindConfig<NeighCallback>,
    pub initial_events: InitialEventsPolicy,
    pub diagnostic_hook: Option<Arc<DiagnosticHook>>,
}

/// Per-record-kind configuration: whether the store tracks this kind, and
/// the optional callback invoked on every `Mod`/`Del` event for it.
pub struct KindConfig<F: ?Sized> {
    pub track: bool,
    pub callback: Option<Arc<F>>,
}

impl<F: ?Sized> Default for KindConfig<F> {
    fn default() -> Self {
        KindConfig {
            track: true,
            callback: None,
        }
    }
}

impl<F: ?Sized> Clone for KindConfig<F> {
    fn clone(&self) -> Self {
        KindConfig {
            track: self.track,
            callback: self.callback.clone(),
        }
    }
}

impl Config {
    /// A config that tracks every kind and observes none of them. Valid on
    /// its own (tracking counts as "something to do").
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link_callback(mut self, f: impl Fn(&Link, EventKind) + Send + Sync + 'static) -> Self {
        self.link.callback = Some(Arc::new(f));
        self
    }

    pub fn with_addr_callback(mut self, f: impl Fn(&Addr, EventKind) + Send + Sync + 'static) -> Self {
        self.addr.callback = Some(Arc::new(f));
        self
    }

    pub fn with_route_callback(mut self, f: impl Fn(&Route, EventKind) + Send + Sync + 'static) -> Self {
        self.route.callback = Some(Arc::new(f));
        self
    }

    pub fn with_neigh_callback(mut self, f: impl Fn(&Neigh, EventKind) + Send + Sync + 'static) -> Self {
        self.neigh.callback = Some(Arc::new(f));
        self
    }

    pub fn with_diagnostic_hook(
        mut self,
        f: impl Fn(&crate::error::Diagnostic) + Send + Sync + 'static,
    ) -> Self {
        self.diagnostic_hook = Some(Arc::new(f));
        self
    }

    pub fn notrack_link(mut self) -> Self {
        self.link.track = false;
        self
    }

    pub fn notrack_addr(mut self) -> Self {
        self.addr.track = false;
        self
    }

    pub fn notrack_route(mut self) -> Self {
        self.route.track = false;
        self
    }

    pub fn notrack_neigh(mut self) -> Self {
        self.neigh.track = false;
        self
    }

    pub fn initial_events(mut self, policy: InitialEventsPolicy) -> Self {
        self.initial_events = policy;
        self
    }

    /// Checks the cross-field invariant from §6: a configuration that
    /// tracks nothing and observes nothing would never produce an
    /// observable effect and is rejected rather than silently accepted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tracks_anything =
            self.link.track || self.addr.track || self.route.track || self.neigh.track;
        let observes_anything = self.link.callback.is_some()
            || self.addr.callback.is_some()
            || self.route.callback.is_some()
            || self.neigh.callback.is_some();

        if !tracks_anything && !observes_anything {
            return Err(ConfigError::NothingToTrackOrObserve);
        }

        Ok(())
    }
}
