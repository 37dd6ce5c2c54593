//! Integration tests against a real `AF_NETLINK` socket and the host's
//! actual interface table. `#[ignore]`d by default (per the teacher's own
//! convention of keeping anything that touches live OS state out of the
//! default `cargo test` run) since they require `CAP_NET_ADMIN`-free but
//! still real kernel access, and their assertions depend on the host
//! actually having at least one network interface.
//!
//! Numbered scenarios below correspond to §8's concrete test scenarios.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netmirror::{Config, EnumerateOptions, EventKind, InitialEventsPolicy, NetMirror};

#[test]
#[ignore = "requires a live netlink socket"]
fn scenario_1_none_initial_events_reports_zero() {
    let config = Config::new().initial_events(InitialEventsPolicy::None);
    let mirror = NetMirror::new(config).expect("netlink socket available");
    std::thread::sleep(Duration::from_millis(50));

    let stats = mirror.sample_stats();
    assert_eq!(stats.current_links, 0);
    assert_eq!(stats.lifetime_link_events, 0);
}

#[test]
#[ignore = "requires a live netlink socket with at least one interface"]
fn scenario_2_block_initial_events_populates_store() {
    let config = Config::new().initial_events(InitialEventsPolicy::Block);
    let mirror = NetMirror::new(config).expect("netlink socket available");

    let stats = mirror.sample_stats();
    assert!(stats.current_links >= 1, "host should report at least `lo`");
    assert!(stats.lifetime_link_events as i64 >= stats.current_links);
    assert!(stats.total_bytes > 0);
}

#[test]
#[ignore = "requires a live netlink socket"]
fn scenario_3_copy_by_invalid_index_counts_as_failure() {
    let config = Config::new().initial_events(InitialEventsPolicy::Block);
    let mirror = NetMirror::new(config).expect("netlink socket available");

    assert!(mirror.copy_link_by_index(-1).is_none());
    assert!(mirror.copy_link_by_index(0).is_none());

    let stats = mirror.sample_stats();
    assert_eq!(stats.lookup_failures, 2);
    assert_eq!(stats.lookup_copies, 0);
    assert_eq!(stats.lookup_shares, 0);
}

#[test]
#[ignore = "requires a live netlink socket with at least one interface"]
fn scenario_4_two_copies_of_same_link_are_distinct_but_equal() {
    let first_index = Arc::new(AtomicI32::new(0));
    let first_index_cb = Arc::clone(&first_index);

    let config = Config::new()
        .initial_events(InitialEventsPolicy::Block)
        .with_link_callback(move |link, kind| {
            if kind == EventKind::Mod {
                first_index_cb.compare_exchange(0, link.index(), Ordering::SeqCst, Ordering::SeqCst).ok();
            }
        });
    let mirror = NetMirror::new(config).expect("netlink socket available");

    let index = first_index.load(Ordering::SeqCst);
    assert_ne!(index, 0, "callback should have observed at least one link");

    let a = mirror.copy_link_by_index(index).expect("link present");
    let b = mirror.copy_link_by_index(index).expect("link present");
    assert_eq!(a.name(), b.name());
}

#[test]
#[ignore = "requires a live netlink socket with at least one interface"]
fn scenario_5_notrack_link_is_invisible_to_queries() {
    let observed_name = Arc::new(std::sync::Mutex::new(None));
    let observed_index = Arc::new(AtomicI32::new(0));
    let name_cb = Arc::clone(&observed_name);
    let index_cb = Arc::clone(&observed_index);

    let config = Config::new()
        .notrack_link()
        .initial_events(InitialEventsPolicy::Block)
        .with_link_callback(move |link, _kind| {
            let mut guard = name_cb.lock().unwrap();
            if guard.is_none() {
                *guard = link.name().map(str::to_owned);
                index_cb.store(link.index(), Ordering::SeqCst);
            }
        });
    let mirror = NetMirror::new(config).expect("netlink socket available");

    let name = observed_name.lock().unwrap().clone();
    let index = observed_index.load(Ordering::SeqCst);
    if let Some(name) = name {
        assert!(mirror.share_link_by_name(&name).is_none());
        assert!(mirror.share_link_by_index(index).is_none());
    }
}

#[test]
#[ignore = "requires a live netlink socket with at least one interface"]
fn scenario_6_streaming_enumerate_covers_every_link() {
    let config = Config::new().initial_events(InitialEventsPolicy::Block);
    let mirror = NetMirror::new(config).expect("netlink socket available");

    let total = mirror.link_count();
    let seen = Arc::new(AtomicUsize::new(0));
    let mut cursor = None;
    loop {
        let batch = mirror
            .enumerate_links(EnumerateOptions::streaming().with_limit(4), cursor)
            .expect("streaming enumerate succeeds on an unchanged store");
        seen.fetch_add(batch.records.len(), Ordering::SeqCst);
        cursor = batch.cursor;
        if cursor.is_none() {
            break;
        }
    }

    assert_eq!(seen.load(Ordering::SeqCst), total);
}

#[test]
#[ignore = "requires a live netlink socket with at least one interface"]
fn scenario_7_minimal_enumerate_keeps_name_drops_rest() {
    let config = Config::new().initial_events(InitialEventsPolicy::Block);
    let mirror = NetMirror::new(config).expect("netlink socket available");

    let batch = mirror
        .enumerate_links(EnumerateOptions::atomic().minimal(), None)
        .expect("atomic enumerate succeeds");
    assert!(!batch.records.is_empty(), "host should report at least `lo`");
    for link in &batch.records {
        assert!(link.mtu().is_none());
        assert!(link.address().is_none());
    }
}

#[test]
#[ignore = "requires a live netlink socket with at least one interface"]
fn scenario_8_kind_scoped_streaming_enumerate_covers_every_addr() {
    let config = Config::new().initial_events(InitialEventsPolicy::Block);
    let mirror = NetMirror::new(config).expect("netlink socket available");

    let total = mirror.addr_count();
    let seen = Arc::new(AtomicUsize::new(0));
    let mut cursor = None;
    loop {
        let batch = mirror
            .enumerate_addrs(EnumerateOptions::streaming().with_limit(4), cursor)
            .expect("streaming enumerate succeeds on an unchanged store");
        seen.fetch_add(batch.records.len(), Ordering::SeqCst);
        cursor = batch.cursor;
        if cursor.is_none() {
            break;
        }
    }

    assert_eq!(seen.load(Ordering::SeqCst), total);
}
