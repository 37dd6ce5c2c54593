//! Turns one decoded record-kind message into a store mutation plus,
//! where configured, a callback invocation.
//!
//! §3's dispatch rule: "the hashlock (or a kind's own mutex) is never
//! held while invoking a user callback — the store is updated first, the
//! lock is dropped, and only then is the callback called with a share (or
//! copy) of the settled record." Each `handle_*` function below follows
//! that shape: mutate, drop the borrow implicitly at function-call
//! boundaries, then call out.
//!
//! §4.3/§8 scenario 5: the callback fires whether or not the kind is
//! tracked — `notrack` only suppresses the store mutation, never the
//! event delivery. For a `notrack`'d delete, there is no removed record
//! to hand back from the store, so the callback gets the record as
//! decoded straight off the wire instead.

use crate::codec::message::RawMessage;
use crate::config::{Config, EventKind};
use crate::record::{Addr, Link, Neigh, Route};
use crate::store::{AddrKey, NeighKey, RouteKey, Store};

fn is_delete(msg_type: i32) -> bool {
    matches!(
        msg_type,
        x if x == libc::RTM_DELLINK as i32
            || x == libc::RTM_DELADDR as i32
            || x == libc::RTM_DELROUTE as i32
            || x == libc::RTM_DELNEIGH as i32
    )
}

pub fn handle_link(msg: &RawMessage, store: &Store, config: &Config) {
    let Some((link, _truncated)) = Link::decode(msg.payload) else {
        store.stats.record_malformed_message();
        return;
    };

    if is_delete(msg.msg_type as i32) {
        let removed = if config.link.track {
            store.links.remove(link.index())
        } else {
            None
        };
        store.stats.record_link_event();
        if let Some(cb) = &config.link.callback {
            cb(removed.as_deref().unwrap_or(&link), EventKind::Del);
            store.stats.record_user_callback();
        }
        return;
    }

    if config.link.track {
        store.links.upsert(link.clone());
    }
    store.stats.record_link_event();
    if let Some(cb) = &config.link.callback {
        cb(&link, EventKind::Mod);
        store.stats.record_user_callback();
    }
}

pub fn handle_addr(msg: &RawMessage, store: &Store, config: &Config) {
    let Some((addr, _truncated)) = Addr::decode(msg.payload) else {
        store.stats.record_malformed_message();
        return;
    };

    if is_delete(msg.msg_type as i32) {
        let removed = if config.addr.track {
            AddrKey::of(&addr).and_then(|key| store.remove_addr(&key))
        } else {
            None
        };
        store.stats.record_addr_event();
        if let Some(cb) = &config.addr.callback {
            cb(removed.as_ref().unwrap_or(&addr), EventKind::Del);
            store.stats.record_user_callback();
        }
        return;
    }

    if config.addr.track {
        store.upsert_addr(addr.clone());
    }
    store.stats.record_addr_event();
    if let Some(cb) = &config.addr.callback {
        cb(&addr, EventKind::Mod);
        store.stats.record_user_callback();
    }
}

pub fn handle_route(msg: &RawMessage, store: &Store, config: &Config) {
    let Some((route, _truncated)) = Route::decode(msg.payload) else {
        store.stats.record_malformed_message();
        return;
    };

    if is_delete(msg.msg_type as i32) {
        let removed = if config.route.track {
            store.remove_route(&RouteKey::of(&route))
        } else {
            None
        };
        store.stats.record_route_event();
        if let Some(cb) = &config.route.callback {
            cb(removed.as_ref().unwrap_or(&route), EventKind::Del);
            store.stats.record_user_callback();
        }
        return;
    }

    if config.route.track {
        store.upsert_route(route.clone());
    }
    store.stats.record_route_event();
    if let Some(cb) = &config.route.callback {
        cb(&route, EventKind::Mod);
        store.stats.record_user_callback();
    }
}

pub fn handle_neigh(msg: &RawMessage, store: &Store, config: &Config) {
    let Some((neigh, _truncated)) = Neigh::decode(msg.payload) else {
        store.stats.record_malformed_message();
        return;
    };

    if is_delete(msg.msg_type as i32) {
        let removed = if config.neigh.track {
            NeighKey::of(&neigh).and_then(|key| store.remove_neigh(&key))
        } else {
            None
        };
        store.stats.record_neigh_event();
        if let Some(cb) = &config.neigh.callback {
            cb(removed.as_ref().unwrap_or(&neigh), EventKind::Del);
            store.stats.record_user_callback();
        }
        return;
    }

    if config.neigh.track {
        store.upsert_neigh(neigh.clone());
    }
    store.stats.record_neigh_event();
    if let Some(cb) = &config.neigh.callback {
        cb(&neigh, EventKind::Mod);
        store.stats.record_user_callback();
    }
}
