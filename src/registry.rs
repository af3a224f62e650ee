//! Cross-instance coordination.
//!
//! When several target objects of the same kind exist simultaneously, their
//! sessions must defer completion until all have reported, then answer
//! uniqueness queries over the full set. The registry is process-scoped state
//! with an explicit lifecycle: created at run start, populated as sessions
//! register, read-only after the run ends. It is passed by handle through
//! session construction, never reached as a bare global.
//!
//! All mutation happens under one lock acquisition, so shared counters and
//! value lists never change across a yield boundary. Waiters are resumed
//! through a watch channel that bumps on every mutation, which is what makes
//! late registration safe: a waiter enqueued before the last instance even
//! registers re-checks on each bump and never misses its wake-up.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::types::value::Value;

/// A registered instance's position within its kind, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceSlot(usize);

impl InstanceSlot {
    /// Zero-based registration index.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
struct KindEntry {
    expected: usize,
    completed: usize,
    /// Extracted values per completed instance, in completion order.
    reported: Vec<Vec<Value>>,
    /// Completion flag per slot, guarding duplicate reports.
    slots_done: Vec<bool>,
}

/// Process-wide table of target instances, keyed by kind.
#[derive(Debug)]
pub struct Registry {
    kinds: RwLock<HashMap<String, KindEntry>>,
    changed: watch::Sender<u64>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            kinds: RwLock::new(HashMap::new()),
            changed,
        }
    }

    /// Register one instance of a kind, growing the expected count.
    ///
    /// Entries are created lazily on first registration and never shrink
    /// during a run.
    pub fn register(&self, kind: &str) -> InstanceSlot {
        let slot = {
            let mut kinds = self.kinds.write().unwrap();
            let entry = kinds.entry(kind.to_owned()).or_default();
            let slot = entry.expected;
            entry.expected += 1;
            entry.slots_done.push(false);
            slot
        };
        self.bump();
        debug!(kind, slot, "instance registered");
        InstanceSlot(slot)
    }

    /// Record one instance's extracted values.
    ///
    /// Values are appended in completion order, not registration order;
    /// uniqueness queries must not assume otherwise. Reporting a slot twice
    /// is ignored with a warning.
    pub fn report_complete(&self, kind: &str, slot: InstanceSlot, values: Vec<Value>) {
        {
            let mut kinds = self.kinds.write().unwrap();
            let Some(entry) = kinds.get_mut(kind) else {
                warn!(kind, "completion reported for a kind with no registrations");
                return;
            };
            match entry.slots_done.get_mut(slot.0) {
                None => {
                    warn!(kind, slot = slot.0, "completion reported for an unknown slot");
                    return;
                }
                Some(done) if *done => {
                    warn!(kind, slot = slot.0, "duplicate completion report ignored");
                    return;
                }
                Some(done) => {
                    *done = true;
                    entry.completed += 1;
                    entry.reported.push(values);
                }
            }
        }
        self.bump();
        debug!(kind, slot = slot.0, "instance reported complete");
    }

    /// Expected instance count for a kind.
    pub fn expected(&self, kind: &str) -> usize {
        self.kinds
            .read()
            .unwrap()
            .get(kind)
            .map_or(0, |e| e.expected)
    }

    /// Completed instance count for a kind.
    pub fn completed(&self, kind: &str) -> usize {
        self.kinds
            .read()
            .unwrap()
            .get(kind)
            .map_or(0, |e| e.completed)
    }

    /// Whether every registered instance of a kind has reported.
    ///
    /// A kind with no registrations is not "all reported" — the total may
    /// only be discoverable after instances start.
    pub fn all_reported(&self, kind: &str) -> bool {
        self.kinds
            .read()
            .unwrap()
            .get(kind)
            .is_some_and(|e| e.expected > 0 && e.completed >= e.expected)
    }

    /// Suspend until every instance of a kind has reported.
    ///
    /// Resumes on exactly the mutation that completes the set. Tolerates
    /// registrations that arrive while waiting. Every registered instance
    /// must eventually report — including one that finishes with no facts,
    /// which reports an empty value list.
    pub async fn wait_all_reported(&self, kind: &str) {
        let mut rx = self.changed.subscribe();
        loop {
            if self.all_reported(kind) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether `value` at `index` is unique among all reported instances.
    ///
    /// True iff exactly one reported value list carries `value` at that
    /// position. Used to build disambiguating descriptions when several
    /// instances of the same kind coexist.
    pub fn unique_across(&self, kind: &str, index: usize, value: &Value) -> bool {
        let kinds = self.kinds.read().unwrap();
        let Some(entry) = kinds.get(kind) else {
            return false;
        };
        entry
            .reported
            .iter()
            .filter(|values| values.get(index) == Some(value))
            .count()
            == 1
    }

    /// Snapshot of a kind's reported value lists, in completion order.
    pub fn reported(&self, kind: &str) -> Vec<Vec<Value>> {
        self.kinds
            .read()
            .unwrap()
            .get(kind)
            .map_or_else(Vec::new, |e| e.reported.clone())
    }

    fn bump(&self) {
        self.changed.send_modify(|n| *n = n.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_grow_monotonically() {
        let registry = Registry::new();
        let a = registry.register("maze");
        let b = registry.register("maze");
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(registry.expected("maze"), 2);
        assert_eq!(registry.completed("maze"), 0);

        registry.report_complete("maze", a, vec![Value::Int(1)]);
        assert_eq!(registry.completed("maze"), 1);
        assert!(!registry.all_reported("maze"));

        registry.report_complete("maze", b, vec![Value::Int(2)]);
        assert!(registry.all_reported("maze"));
    }

    #[test]
    fn empty_kind_is_never_all_reported() {
        let registry = Registry::new();
        assert!(!registry.all_reported("maze"));
    }

    #[test]
    fn duplicate_reports_are_ignored() {
        let registry = Registry::new();
        let slot = registry.register("maze");
        registry.register("maze");
        registry.report_complete("maze", slot, vec![Value::Int(1)]);
        registry.report_complete("maze", slot, vec![Value::Int(9)]);
        assert_eq!(registry.completed("maze"), 1);
        assert_eq!(registry.reported("maze"), vec![vec![Value::Int(1)]]);
    }

    #[test]
    fn reported_values_are_in_completion_order() {
        let registry = Registry::new();
        let first = registry.register("maze");
        let second = registry.register("maze");
        // The later registration completes first.
        registry.report_complete("maze", second, vec![Value::from("B")]);
        registry.report_complete("maze", first, vec![Value::from("A")]);
        assert_eq!(
            registry.reported("maze"),
            vec![vec![Value::from("B")], vec![Value::from("A")]]
        );
    }

    #[test]
    fn unique_across_counts_exact_matches() {
        let registry = Registry::new();
        let slots: Vec<_> = (0..3).map(|_| registry.register("maze")).collect();
        registry.report_complete("maze", slots[0], vec![Value::Int(1), Value::Int(2)]);
        registry.report_complete("maze", slots[1], vec![Value::Int(1), Value::Int(3)]);
        registry.report_complete("maze", slots[2], vec![Value::Int(5), Value::Int(2)]);

        assert!(registry.unique_across("maze", 1, &Value::Int(3)));
        assert!(!registry.unique_across("maze", 1, &Value::Int(2)));
        assert!(registry.unique_across("maze", 0, &Value::Int(5)));
        assert!(!registry.unique_across("maze", 0, &Value::Int(1)));
        // A value nobody reported is not unique, it is absent.
        assert!(!registry.unique_across("maze", 0, &Value::Int(9)));
        assert!(!registry.unique_across("other", 0, &Value::Int(1)));
    }

    #[test]
    fn barrier_releases_on_the_final_report() {
        let registry = Registry::new();
        let slots: Vec<_> = (0..3).map(|_| registry.register("maze")).collect();

        let mut waiter = tokio_test::task::spawn(registry.wait_all_reported("maze"));
        tokio_test::assert_pending!(waiter.poll());

        registry.report_complete("maze", slots[0], vec![]);
        registry.report_complete("maze", slots[1], vec![]);
        tokio_test::assert_pending!(waiter.poll(), "barrier must not release early");

        registry.report_complete("maze", slots[2], vec![]);
        assert!(waiter.is_woken(), "the final report wakes the waiter");
        tokio_test::assert_ready!(waiter.poll());
    }

    #[test]
    fn barrier_tolerates_late_registration() {
        let registry = Registry::new();
        let first = registry.register("maze");

        let mut waiter = tokio_test::task::spawn(registry.wait_all_reported("maze"));
        tokio_test::assert_pending!(waiter.poll());

        // A second instance registers after the waiter enqueued.
        let late = registry.register("maze");
        registry.report_complete("maze", first, vec![]);
        tokio_test::assert_pending!(waiter.poll(), "late registration raised the total");

        registry.report_complete("maze", late, vec![]);
        tokio_test::assert_ready!(waiter.poll());
    }

    #[test]
    fn waiter_enqueued_before_any_registration_waits() {
        let registry = Registry::new();
        let mut waiter = tokio_test::task::spawn(registry.wait_all_reported("maze"));
        tokio_test::assert_pending!(waiter.poll());

        let slot = registry.register("maze");
        tokio_test::assert_pending!(waiter.poll(), "registration alone is not completion");
        registry.report_complete("maze", slot, vec![]);
        tokio_test::assert_ready!(waiter.poll());
    }
}
