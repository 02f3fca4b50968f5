//! Record Collections - Ordered containers filled during hydration
//!
//! A [`Collection`] is a shared handle: the caller owns it through whatever
//! result structure it was built for, while the pass that created it keeps
//! only a weak reference in its [`CollectionRegistry`] so it can take a
//! snapshot at flush time.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Frozen copy of a collection's members at the moment it was taken
pub struct Snapshot<R> {
    records: Arc<[R]>,
    taken_at: DateTime<Utc>,
}

impl<R> Snapshot<R> {
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

impl<R: PartialEq> Snapshot<R> {
    pub fn contains(&self, record: &R) -> bool {
        self.records.contains(record)
    }
}

impl<R> Clone for Snapshot<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            taken_at: self.taken_at,
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Snapshot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("records", &self.records)
            .field("taken_at", &self.taken_at)
            .finish()
    }
}

struct CollectionState<R> {
    component: String,
    records: Vec<R>,
    snapshot: Option<Snapshot<R>>,
}

/// Ordered, mutable container of records for one component
pub struct Collection<R> {
    inner: Arc<RwLock<CollectionState<R>>>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> Collection<R> {
    pub fn new(component: &str) -> Self {
        Self::with_capacity(component, 0)
    }

    pub fn with_capacity(component: &str, capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CollectionState {
                component: component.to_string(),
                records: Vec::with_capacity(capacity),
                snapshot: None,
            })),
        }
    }

    /// Component this collection holds records for
    pub fn component(&self) -> String {
        self.inner.read().component.clone()
    }

    pub fn append(&self, record: R) {
        self.inner.write().records.push(record);
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Position of the last member, `None` when empty
    pub fn last_key(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    /// Run a closure over the current members without cloning them
    pub fn with_records<T>(&self, f: impl FnOnce(&[R]) -> T) -> T {
        f(&self.inner.read().records)
    }

    /// Mutate the members in place
    pub fn with_records_mut<T>(&self, f: impl FnOnce(&mut Vec<R>) -> T) -> T {
        f(&mut self.inner.write().records)
    }

    /// Last snapshot taken, if any
    pub fn snapshot(&self) -> Option<Snapshot<R>> {
        self.inner.read().snapshot.clone()
    }

    pub fn has_snapshot(&self) -> bool {
        self.inner.read().snapshot.is_some()
    }

    /// True when both handles point at the same collection
    pub fn ptr_eq(&self, other: &Collection<R>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn downgrade(&self) -> Weak<RwLock<CollectionState<R>>> {
        Arc::downgrade(&self.inner)
    }
}

impl<R: Clone> Collection<R> {
    pub fn get(&self, index: usize) -> Option<R> {
        self.inner.read().records.get(index).cloned()
    }

    /// Clone of the current members
    pub fn records(&self) -> Vec<R> {
        self.inner.read().records.clone()
    }

    /// Replace the stored snapshot with the current members
    pub fn take_snapshot(&self) -> Snapshot<R> {
        let mut state = self.inner.write();
        let snapshot = Snapshot {
            records: Arc::from(state.records.as_slice()),
            taken_at: Utc::now(),
        };
        state.snapshot = Some(snapshot.clone());
        snapshot
    }
}

impl<R: Clone + PartialEq> Collection<R> {
    /// Members present now but not in the last snapshot
    pub fn inserted_since_snapshot(&self) -> Vec<R> {
        let state = self.inner.read();
        match &state.snapshot {
            Some(snapshot) => state
                .records
                .iter()
                .filter(|record| !snapshot.contains(record))
                .cloned()
                .collect(),
            None => state.records.clone(),
        }
    }

    /// Members of the last snapshot that are no longer present
    pub fn removed_since_snapshot(&self) -> Vec<R> {
        let state = self.inner.read();
        match &state.snapshot {
            Some(snapshot) => snapshot
                .iter()
                .filter(|record| !state.records.contains(record))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

impl<R> fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("Collection")
            .field("component", &state.component)
            .field("len", &state.records.len())
            .field("snapshot_len", &state.snapshot.as_ref().map(Snapshot::len))
            .finish()
    }
}

/// Outcome of snapshotting every tracked collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotSummary {
    /// Collections that were still alive and got a snapshot
    pub snapshotted: usize,
    /// Collections already dropped by their owner
    pub dropped: usize,
}

/// Weak set of the collections created or adopted by one hydration pass
pub struct CollectionRegistry<R> {
    collections: Vec<Weak<RwLock<CollectionState<R>>>>,
    // Weak refs keep the allocation alive, so addresses stay unique
    seen: HashSet<usize>,
}

impl<R> Default for CollectionRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> CollectionRegistry<R> {
    pub fn new() -> Self {
        Self {
            collections: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Create an empty collection and track it
    pub fn create(&mut self, component: &str, capacity: usize) -> Collection<R> {
        let collection = Collection::with_capacity(component, capacity);
        self.register(&collection);
        collection
    }

    /// Track a collection built elsewhere. Returns false if it was already tracked.
    pub fn register(&mut self, collection: &Collection<R>) -> bool {
        let address = Arc::as_ptr(&collection.inner) as *const () as usize;
        if !self.seen.insert(address) {
            return false;
        }
        self.collections.push(collection.downgrade());
        true
    }

    /// Number of tracked collections, including dropped ones
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Number of tracked collections still owned by someone
    pub fn live_count(&self) -> usize {
        self.collections
            .iter()
            .filter(|collection| collection.strong_count() > 0)
            .count()
    }
}

impl<R: Clone> CollectionRegistry<R> {
    /// Snapshot every tracked collection that is still alive
    pub fn snapshot_all(&self) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();

        for weak in &self.collections {
            match weak.upgrade() {
                Some(inner) => {
                    Collection { inner }.take_snapshot();
                    summary.snapshotted += 1;
                }
                None => summary.dropped += 1,
            }
        }

        summary
    }
}

impl<R> fmt::Debug for CollectionRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionRegistry")
            .field("tracked", &self.collections.len())
            .field("live", &self.live_count())
            .finish()
    }
}
