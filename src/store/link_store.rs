//! The link store: a 256-bucket chained hash table keyed by `ifindex`,
//! paired with a [`super::trie::NameTrie`] for by-name lookup, both
//! protected by one mutex (§3's "hashlock": "index lookup, name lookup
//! and mutation all serialize on a single lock; there is no separate
//! per-bucket locking, since link churn is low-frequency compared to
//! address/route/neighbor churn").
//!
//! A shared record is handed out as `Arc<Link>` — Rust's atomic refcount
//! is the natural replacement for the spec's manual share/copy/abandon
//! bookkeeping: cloning the `Arc` is "share", [`Link`]'s `Clone` impl
//! (a deep copy of the decoded fields) is "copy", and dropping the `Arc`
//! is "abandon". A share can outlive the record's removal from the
//! table — that's the "zombie" case tracked in [`super::stats::Stats`].

use std::sync::{Arc, Mutex};

use crate::record::Link;

use super::stats::Stats;
use super::trie::NameTrie;

const BUCKET_COUNT: usize = 256;

fn bucket_of(index: i32) -> usize {
    (index as u32 as usize) % BUCKET_COUNT
}

struct Inner {
    buckets: Vec<Vec<Arc<Link>>>,
    names: NameTrie,
}

impl Inner {
    fn find_slot(&self, index: i32) -> Option<(usize, usize)> {
        let bucket = bucket_of(index);
        self.buckets[bucket]
            .iter()
            .position(|l| l.index() == index)
            .map(|slot| (bucket, slot))
    }
}

/// The concurrent link table plus its change nonce, used by the
/// enumerator to detect a store mutation across resumable calls (§4.5:
/// "a streaming call that observes the nonce has changed since its
/// cursor was issued fails with `StoreMutated` rather than silently
/// skipping or repeating records").
pub struct LinkStore {
    inner: Mutex<Inner>,
    nonce: std::sync::atomic::AtomicU64,
    stats: Arc<Stats>,
}

impl LinkStore {
    pub fn new(stats: Arc<Stats>) -> Self {
        LinkStore {
            inner: Mutex::new(Inner {
                buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
                names: NameTrie::new(),
            }),
            nonce: std::sync::atomic::AtomicU64::new(0),
            stats,
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce.load(std::sync::atomic::Ordering::Acquire)
    }

    fn bump_nonce(&self) {
        self.nonce.fetch_add(1, std::sync::atomic::Ordering::AcqRel);
    }

    /// Inserts or replaces the link at `link.index()`. Replacing an
    /// existing link drops its old name from the trie before indexing the
    /// new one (§3: "a record is immutable once built; an update replaces
    /// the whole record").
    pub fn upsert(&self, link: Link) {
        let mut inner = self.inner.lock().unwrap();
        let index = link.index();
        let byte_delta = link.raw_attrs().len() as i64;
        let new_name = link.name().map(str::to_owned);
        let new = Arc::new(link);

        match inner.find_slot(index) {
            Some((bucket, slot)) => {
                let old = std::mem::replace(&mut inner.buckets[bucket][slot], new);
                self.stats.adjust_bytes(byte_delta - old.raw_attrs().len() as i64);
                if let Some(old_name) = old.name() {
                    if Some(old_name) != new_name.as_deref() {
                        inner.names.remove(old_name);
                    }
                }
            }
            None => {
                let bucket = bucket_of(index);
                inner.buckets[bucket].push(new);
                self.stats.adjust_current_links(1);
                self.stats.adjust_bytes(byte_delta);
            }
        }
        if let Some(name) = new_name {
            inner.names.insert(&name, index);
        }
        self.bump_nonce();
    }

    /// Removes the link at `index`, if present, returning a share of it
    /// (useful for firing a `Del` event with the record that was removed).
    ///
    /// If another share of this record is still outstanding at the moment
    /// of removal, that share is about to become a zombie (§3): it will
    /// keep the record alive past its deletion from the table. Counted
    /// here, at the one place that knows both the table's own reference
    /// and whatever the caller is about to return.
    pub fn remove(&self, index: i32) -> Option<Arc<Link>> {
        let mut inner = self.inner.lock().unwrap();
        let (bucket, slot) = inner.find_slot(index)?;
        let removed = inner.buckets[bucket].swap_remove(slot);
        if let Some(name) = removed.name() {
            inner.names.remove(name);
        }
        self.stats.adjust_current_links(-1);
        self.stats.adjust_bytes(-(removed.raw_attrs().len() as i64));
        if Arc::strong_count(&removed) > 1 {
            self.stats.record_zombie_share();
        }
        self.bump_nonce();
        Some(removed)
    }

    /// §3's "share": an `Arc` clone, O(1), no copy of the record's bytes.
    pub fn share_by_index(&self, index: i32) -> Option<Arc<Link>> {
        let inner = self.inner.lock().unwrap();
        let (bucket, slot) = inner.find_slot(index)?;
        Some(Arc::clone(&inner.buckets[bucket][slot]))
    }

    pub fn share_by_name(&self, name: &str) -> Option<Arc<Link>> {
        let inner = self.inner.lock().unwrap();
        let index = inner.names.get(name)?;
        let (bucket, slot) = inner.find_slot(index)?;
        Some(Arc::clone(&inner.buckets[bucket][slot]))
    }

    /// §3's "copy": a deep clone of the decoded record, independent of
    /// the store's own lifetime management.
    pub fn copy_by_index(&self, index: i32) -> Option<Link> {
        self.share_by_index(index).map(|arc| (*arc).clone())
    }

    pub fn copy_by_name(&self, name: &str) -> Option<Link> {
        self.share_by_name(name).map(|arc| (*arc).clone())
    }

    pub fn count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.buckets.iter().map(Vec::len).sum()
    }

    /// Snapshots every link in bucket order, for the enumerator. The
    /// snapshot is a `Vec` of cheap `Arc` clones; it does not hold the
    /// table lock once built.
    pub fn snapshot(&self) -> Vec<Arc<Link>> {
        let inner = self.inner.lock().unwrap();
        inner.buckets.iter().flatten().cloned().collect()
    }

    /// Collects up to `limit` records walking forward from the exact
    /// `(bucket, offset)` slot, advancing into later buckets as the
    /// current one is exhausted. Returns the collected shares plus the
    /// slot to resume from on the next call, or `None` once the walk
    /// reaches the end of the table.
    ///
    /// A bucket holds more than one record once its index space wraps
    /// (two links `BUCKET_COUNT` apart collide), so resuming a streaming
    /// enumeration needs the within-bucket offset as well as the bucket
    /// index — a bucket-only cursor would silently drop every record
    /// after the first one taken from a collided bucket.
    pub fn collect_from(
        &self,
        start_bucket: usize,
        start_offset: usize,
        limit: usize,
    ) -> (Vec<Arc<Link>>, Option<(usize, usize)>) {
        let inner = self.inner.lock().unwrap();
        let mut taken = Vec::new();
        let mut bucket = start_bucket;
        let mut offset = start_offset;

        while bucket < inner.buckets.len() {
            let slots = &inner.buckets[bucket];
            while offset < slots.len() {
                if taken.len() == limit {
                    return (taken, Some((bucket, offset)));
                }
                taken.push(Arc::clone(&slots[offset]));
                offset += 1;
            }
            bucket += 1;
            offset = 0;
        }
        (taken, None)
    }

    pub fn bucket_count(&self) -> usize {
        BUCKET_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Link;

    fn make_link(payload: &[u8]) -> Link {
        Link::decode(payload).unwrap().0
    }

    fn ifinfomsg_with_name(index: i32, name: &str) -> Vec<u8> {
        use std::mem;
        let mut buf = vec![0u8; mem::size_of::<libc::ifinfomsg>()];
        buf[4..8].copy_from_slice(&index.to_ne_bytes());
        let mut name_bytes = name.as_bytes().to_vec();
        name_bytes.push(0);
        let hdr_len = mem::size_of::<libc::rtattr>();
        let rta_len = (hdr_len + name_bytes.len()) as u16;
        buf.extend_from_slice(&rta_len.to_ne_bytes());
        buf.extend_from_slice(&(libc::IFLA_IFNAME as u16).to_ne_bytes());
        buf.extend_from_slice(&name_bytes);
        let padded = crate::codec::align(rta_len as usize);
        buf.resize(buf.len() + (padded - rta_len as usize), 0);
        buf
    }

    #[test]
    fn insert_share_and_remove() {
        let stats = Arc::new(Stats::new());
        let store = LinkStore::new(stats);
        let link = make_link(&ifinfomsg_with_name(2, "eth0"));
        store.upsert(link);

        assert_eq!(store.count(), 1);
        let shared = store.share_by_index(2).unwrap();
        assert_eq!(shared.index(), 2);
        let by_name = store.share_by_name("eth0").unwrap();
        assert_eq!(by_name.index(), 2);

        let removed = store.remove(2).unwrap();
        assert_eq!(removed.index(), 2);
        assert_eq!(store.count(), 0);
        assert!(store.share_by_name("eth0").is_none());

        // The earlier share survives removal (zombie handle).
        assert_eq!(shared.index(), 2);
    }

    #[test]
    fn nonce_changes_on_mutation() {
        let stats = Arc::new(Stats::new());
        let store = LinkStore::new(stats);
        let n0 = store.nonce();
        store.upsert(make_link(&ifinfomsg_with_name(1, "lo")));
        assert_ne!(store.nonce(), n0);
    }

    #[test]
    fn rename_updates_trie() {
        let stats = Arc::new(Stats::new());
        let store = LinkStore::new(stats);
        store.upsert(make_link(&ifinfomsg_with_name(4, "eth0")));
        store.upsert(make_link(&ifinfomsg_with_name(4, "eth1")));

        assert!(store.share_by_name("eth0").is_none());
        assert_eq!(store.share_by_name("eth1").unwrap().index(), 4);
    }
}
