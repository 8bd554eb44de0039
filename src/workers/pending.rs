//! Per-worker working set of unresolved orders.

use crate::model::OrderNumber;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingOrder {
    pub last_polled: Option<Instant>,
    /// Polls so far, reported in the worker's retry logs.
    pub attempts: u32,
}

/// Orders owned by one polling worker.
///
/// Private to its worker; no other task ever sees it.
#[derive(Debug, Default)]
pub struct PendingSet {
    entries: BTreeMap<OrderNumber, PendingOrder>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an order. Returns `false` if it was already pending.
    pub fn insert(&mut self, number: OrderNumber) -> bool {
        if self.entries.contains_key(&number) {
            return false;
        }
        self.entries.insert(number, PendingOrder::default());
        true
    }

    /// Drops an order once it is resolved.
    pub fn remove(&mut self, number: &OrderNumber) -> bool {
        self.entries.remove(number).is_some()
    }

    pub fn contains(&self, number: &OrderNumber) -> bool {
        self.entries.contains_key(number)
    }

    pub fn get(&self, number: &OrderNumber) -> Option<&PendingOrder> {
        self.entries.get(number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mark_polled(&mut self, number: &OrderNumber, at: Instant) {
        if let Some(entry) = self.entries.get_mut(number) {
            entry.last_polled = Some(at);
            entry.attempts += 1;
        }
    }

    /// Orders whose last poll is at least `min_interval` before `now`.
    /// Never-polled orders are always due.
    pub fn due(&self, now: Instant, min_interval: Duration) -> Vec<OrderNumber> {
        self.entries
            .iter()
            .filter(|(_, entry)| match entry.last_polled {
                None => true,
                Some(at) => now.saturating_duration_since(at) >= min_interval,
            })
            .map(|(number, _)| number.clone())
            .collect()
    }

    /// Earliest instant at which some order becomes due again.
    pub fn next_due(&self, min_interval: Duration) -> Option<Instant> {
        let now = Instant::now();
        self.entries
            .values()
            .map(|entry| entry.last_polled.map_or(now, |at| at + min_interval))
            .min()
    }
}

impl FromIterator<OrderNumber> for PendingSet {
    fn from_iter<I: IntoIterator<Item = OrderNumber>>(iter: I) -> Self {
        let mut set = PendingSet::new();
        for number in iter {
            set.insert(number);
        }
        set
    }
}

/// Splits the startup backlog across `workers` polling workers.
///
/// Every worker gets `len / workers` consecutive orders and the last worker
/// also takes the remainder. `workers == 0` is treated as one worker. The
/// result always has exactly `max(workers, 1)` slices.
pub fn partition_pending(orders: Vec<OrderNumber>, workers: usize) -> Vec<Vec<OrderNumber>> {
    let workers = workers.max(1);
    let chunk = orders.len() / workers;

    let mut remaining = orders.into_iter();
    let mut slices: Vec<Vec<OrderNumber>> = (0..workers - 1)
        .map(|_| remaining.by_ref().take(chunk).collect())
        .collect();
    slices.push(remaining.collect());
    slices
}
