//! Local Store: the per-instance map of cached orders.

use std::collections::HashMap;

use parking_lot::Mutex;
use streamcache_core::{Mutation, Order, OrderId};

/// Concurrency-safe map from order id to order, owned by one cache instance.
///
/// The serving path (reads and cache-aside fills) and the subscriber (log
/// applies) race on it. A single mutex guards the whole map and is held only
/// for the duration of one call, never across an await.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    orders: HashMap<OrderId, Order>,
    /// Ids with a fill in flight. Only these need their applies tracked.
    pending: HashMap<OrderId, PendingFill>,
    /// Bumped on every write to `orders`.
    generation: u64,
}

#[derive(Debug, Default)]
struct PendingFill {
    readers: usize,
    last_written: u64,
}

impl Entries {
    fn written(&mut self, id: &OrderId) {
        self.generation += 1;
        if let Some(pending) = self.pending.get_mut(id) {
            pending.last_written = self.generation;
        }
    }

    fn put(&mut self, order: Order) {
        self.written(&order.id);
        self.orders.insert(order.id.clone(), order);
    }

    fn remove(&mut self, id: &OrderId) -> bool {
        self.written(id);
        self.orders.remove(id).is_some()
    }

    /// Drop one reader's interest in `id`. Returns `true` if the id was
    /// written after generation `since`.
    fn release(&mut self, id: &OrderId, since: u64) -> bool {
        let Some(pending) = self.pending.get_mut(id) else {
            return false;
        };
        let superseded = pending.last_written > since;
        pending.readers = pending.readers.saturating_sub(1);
        if pending.readers == 0 {
            self.pending.remove(id);
        }
        superseded
    }
}

/// Result of [`LocalStore::lookup`].
pub enum Lookup<'a> {
    Hit(Order),
    /// The id is absent. Fetch it and hand the result to the ticket.
    Miss(FillTicket<'a>),
}

/// A cache-aside fill in progress for one id.
///
/// Taken atomically with the miss, so any log record for the id applied
/// while the system of record is being queried is seen by
/// [`fill`](Self::fill). Dropping the ticket abandons the fill.
#[must_use]
pub struct FillTicket<'a> {
    store: &'a LocalStore,
    id: OrderId,
    generation: u64,
    released: bool,
}

impl FillTicket<'_> {
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Store the fetched order unless the id was written since the miss.
    ///
    /// Returns the order to serve and whether it was stored. A value the
    /// subscriber put in the meantime wins over the fetched one. After a
    /// delete the fetched order is still returned but not cached, so the
    /// store keeps agreeing with the log.
    pub fn fill(mut self, order: Order) -> (Order, bool) {
        let mut entries = self.store.entries.lock();
        self.released = true;
        let superseded = entries.release(&self.id, self.generation);

        if let Some(current) = entries.orders.get(&self.id) {
            return (current.clone(), false);
        }
        if superseded {
            return (order, false);
        }
        entries.orders.insert(self.id.clone(), order.clone());
        (order, true)
    }
}

impl Drop for FillTicket<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.store.entries.lock().release(&self.id, self.generation);
        }
    }
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an order. A miss is not an error.
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.entries.lock().orders.get(id).cloned()
    }

    /// Look up an order, registering a fill for it on a miss.
    pub fn lookup(&self, id: &OrderId) -> Lookup<'_> {
        let mut entries = self.entries.lock();
        if let Some(order) = entries.orders.get(id) {
            return Lookup::Hit(order.clone());
        }

        let generation = entries.generation;
        entries.pending.entry(id.clone()).or_default().readers += 1;
        Lookup::Miss(FillTicket {
            store: self,
            id: id.clone(),
            generation,
            released: false,
        })
    }

    /// Insert or replace the order with the same id.
    pub fn put(&self, order: Order) {
        self.entries.lock().put(order);
    }

    /// Remove an order. Returns `false` when there was nothing to remove.
    pub fn remove(&self, id: &OrderId) -> bool {
        self.entries.lock().remove(id)
    }

    /// Fold one mutation into the store.
    pub fn apply(&self, mutation: &Mutation) {
        let mut entries = self.entries.lock();
        match mutation {
            Mutation::Save(order) | Mutation::Update(order) => entries.put(order.clone()),
            Mutation::Delete(id) => {
                entries.remove(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, sorted by id.
    pub fn snapshot(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.entries.lock().orders.values().cloned().collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        orders
    }

    #[cfg(test)]
    fn pending_fills(&self) -> usize {
        self.entries.lock().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, cost: i64) -> Order {
        Order::new(OrderId::new(id), "widget", cost, false)
    }

    #[test]
    fn test_put_get_remove() {
        let store = LocalStore::new();
        assert!(store.get(&OrderId::new("a")).is_none());

        store.put(order("a", 10));
        assert_eq!(store.get(&OrderId::new("a")).unwrap().cost, 10);

        store.put(order("a", 20));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&OrderId::new("a")).unwrap().cost, 20);

        assert!(store.remove(&OrderId::new("a")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_save_is_idempotent() {
        let once = LocalStore::new();
        let twice = LocalStore::new();
        let mutation = Mutation::Save(order("a", 10));

        once.apply(&mutation);
        twice.apply(&mutation);
        twice.apply(&mutation);

        assert_eq!(once.snapshot().len(), twice.snapshot().len());
        assert!(once.snapshot()[0].same_content(&twice.snapshot()[0]));
    }

    #[test]
    fn test_delete_of_absent_is_noop() {
        let store = LocalStore::new();
        store.put(order("a", 10));

        assert!(!store.remove(&OrderId::new("missing")));
        store.apply(&Mutation::Delete(OrderId::new("missing")));

        assert_eq!(store.len(), 1);
        assert!(store.get(&OrderId::new("a")).unwrap().same_content(&order("a", 10)));
    }

    fn miss<'a>(store: &'a LocalStore, id: &str) -> FillTicket<'a> {
        match store.lookup(&OrderId::new(id)) {
            Lookup::Miss(ticket) => ticket,
            Lookup::Hit(order) => panic!("expected a miss, found {order:?}"),
        }
    }

    #[test]
    fn test_lookup_hit_takes_no_ticket() {
        let store = LocalStore::new();
        store.put(order("a", 10));
        assert!(matches!(store.lookup(&OrderId::new("a")), Lookup::Hit(o) if o.cost == 10));
        assert_eq!(store.pending_fills(), 0);
    }

    #[test]
    fn test_fill_stores_fetched_order() {
        let store = LocalStore::new();
        let ticket = miss(&store, "b");
        assert_eq!(ticket.id().as_str(), "b");

        let (filled, stored) = ticket.fill(order("b", 5));
        assert!(stored);
        assert!(filled.same_content(&order("b", 5)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.pending_fills(), 0);
    }

    #[test]
    fn test_fill_does_not_overwrite_applied_value() {
        let store = LocalStore::new();
        let ticket = miss(&store, "a");
        store.apply(&Mutation::Update(order("a", 20)));

        let (current, stored) = ticket.fill(order("a", 10));
        assert!(!stored);
        assert_eq!(current.cost, 20);
        assert_eq!(store.get(&OrderId::new("a")).unwrap().cost, 20);
    }

    #[test]
    fn test_fill_after_concurrent_delete_is_dropped() {
        let store = LocalStore::new();
        let ticket = miss(&store, "a");
        store.apply(&Mutation::Delete(OrderId::new("a")));

        let (served, stored) = ticket.fill(order("a", 10));
        assert!(!stored);
        assert_eq!(served.cost, 10);
        assert!(store.is_empty());
    }

    #[test]
    fn test_writes_to_other_ids_do_not_block_fill() {
        let store = LocalStore::new();
        let ticket = miss(&store, "a");
        store.apply(&Mutation::Delete(OrderId::new("b")));
        store.put(order("c", 1));

        let (_, stored) = ticket.fill(order("a", 10));
        assert!(stored);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_later_miss_is_not_blocked_by_earlier_write() {
        let store = LocalStore::new();
        let early = miss(&store, "a");
        store.apply(&Mutation::Delete(OrderId::new("a")));
        let late = miss(&store, "a");

        assert!(!early.fill(order("a", 1)).1);
        assert!(late.fill(order("a", 2)).1);
        assert_eq!(store.get(&OrderId::new("a")).unwrap().cost, 2);
        assert_eq!(store.pending_fills(), 0);
    }

    #[test]
    fn test_dropped_ticket_releases_pending_fill() {
        let store = LocalStore::new();
        drop(miss(&store, "a"));
        assert_eq!(store.pending_fills(), 0);
    }

    #[test]
    fn test_snapshot_is_sorted_by_id() {
        let store = LocalStore::new();
        store.put(order("c", 3));
        store.put(order("a", 1));
        store.put(order("b", 2));

        let ids: Vec<String> = store
            .snapshot()
            .into_iter()
            .map(|o| o.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concurrent_access_does_not_corrupt() {
        let store = std::sync::Arc::new(LocalStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let id = format!("{t}-{i}");
                        store.put(order(&id, i));
                        assert!(store.get(&OrderId::new(id.as_str())).is_some());
                        if i % 2 == 0 {
                            store.remove(&OrderId::new(id.as_str()));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8 * 50);
    }
}
