//! Scheduler Policies
//!
//! A scheduler policy picks the next process to run from the ready queue.
//!
//! ## Philosophy
//!
//! - **Mechanism, not policy**: the manager moves processes between queues;
//!   a policy only chooses which one leaves ready next.
//! - **Determinism first**: same queue contents => same choice. Ties go to
//!   the element encountered first, which is the oldest arrival.
//! - **Explicit registry**: policies are looked up by name in a table of
//!   constructors, never by inspecting types at runtime.
//!
//! ## Policies
//!
//! - [`RoundRobin`]: head of the queue, no scan
//! - [`ShortestJobFirst`]: smallest burst estimate
//! - [`PriorityFirst`]: smallest priority value

use crate::list::List;
use crate::pcb::Pcb;
use kernel_api::KernelError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ready queue as seen by a policy
pub type ReadyQueue = List<Arc<Pcb>>;

/// Selects and removes the next process to run
pub trait SchedulerPolicy: Send {
    /// Canonical registry name
    fn name(&self) -> &'static str;

    /// Removes and returns the chosen process, or `None` on an empty queue
    ///
    /// Must not touch anything but `queue`.
    fn schedule_next(&mut self, queue: &mut ReadyQueue) -> Option<Arc<Pcb>>;
}

/// First in, first out
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn boxed() -> Box<dyn SchedulerPolicy> {
        Box::new(Self)
    }
}

impl SchedulerPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn schedule_next(&mut self, queue: &mut ReadyQueue) -> Option<Arc<Pcb>> {
        queue.pop()
    }
}

/// Smallest burst estimate first
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortestJobFirst;

impl ShortestJobFirst {
    pub fn boxed() -> Box<dyn SchedulerPolicy> {
        Box::new(Self)
    }
}

impl SchedulerPolicy for ShortestJobFirst {
    fn name(&self) -> &'static str {
        "shortest_job_first"
    }

    fn schedule_next(&mut self, queue: &mut ReadyQueue) -> Option<Arc<Pcb>> {
        take_min_by_key(queue, |pcb| pcb.burst_estimate())
    }
}

/// Lowest priority value first
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityFirst;

impl PriorityFirst {
    pub fn boxed() -> Box<dyn SchedulerPolicy> {
        Box::new(Self)
    }
}

impl SchedulerPolicy for PriorityFirst {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn schedule_next(&mut self, queue: &mut ReadyQueue) -> Option<Arc<Pcb>> {
        take_min_by_key(queue, |pcb| pcb.priority())
    }
}

/// Removes the first element holding the strict minimum key
fn take_min_by_key<K, F>(queue: &mut ReadyQueue, key: F) -> Option<Arc<Pcb>>
where
    K: PartialOrd,
    F: Fn(&Pcb) -> K,
{
    let mut best: Option<(usize, K)> = None;
    for (index, pcb) in queue.iter().enumerate() {
        let candidate = key(pcb);
        let better = match &best {
            Some((_, current)) => candidate < *current,
            None => true,
        };
        if better {
            best = Some((index, candidate));
        }
    }
    let (index, _) = best?;
    queue.remove_at(index)
}

/// Constructor stored in the registry
pub type SchedulerFactory = fn() -> Box<dyn SchedulerPolicy>;

/// Name -> constructor table for scheduler policies
///
/// Lookups ignore case, `_`, `-` and spaces, so `round_robin`,
/// `RoundRobin` and `round-robin` all name the same policy.
#[derive(Clone)]
pub struct SchedulerRegistry {
    factories: BTreeMap<String, SchedulerFactory>,
    canonical: Vec<&'static str>,
}

impl SchedulerRegistry {
    /// Creates a registry with no policies
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
            canonical: Vec::new(),
        }
    }

    /// Creates a registry with the built-in policies and their aliases
    pub fn new() -> Self {
        let builtin: [(SchedulerFactory, &[&str]); 3] = [
            (RoundRobin::boxed, &["rr", "RoundRobinScheduler"]),
            (ShortestJobFirst::boxed, &["sjf", "SJFScheduler"]),
            (PriorityFirst::boxed, &["priority_first", "PrioritySJFScheduler"]),
        ];

        let mut registry = Self::empty();
        for (factory, aliases) in builtin {
            registry.register(factory);
            for alias in aliases {
                registry.insert_alias(alias, factory);
            }
        }
        registry
    }

    fn normalize(name: &str) -> String {
        name.chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Registers a policy under the name it reports
    ///
    /// The factory is invoked once so the name is taken from a real
    /// instance. An existing entry with the same name is replaced.
    pub fn register(&mut self, factory: SchedulerFactory) -> &'static str {
        let name = factory().name();
        self.factories.insert(Self::normalize(name), factory);
        if !self.canonical.contains(&name) {
            self.canonical.push(name);
        }
        name
    }

    /// Makes `alias` resolve to the policy registered as `target`
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<(), KernelError> {
        let factory = *self
            .factories
            .get(&Self::normalize(target))
            .ok_or_else(|| KernelError::UnknownScheduler(target.to_string()))?;
        self.insert_alias(alias, factory);
        Ok(())
    }

    fn insert_alias(&mut self, alias: &str, factory: SchedulerFactory) {
        self.factories.insert(Self::normalize(alias), factory);
    }

    /// Builds the policy registered under `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn SchedulerPolicy>, KernelError> {
        self.factories
            .get(&Self::normalize(name))
            .map(|factory| factory())
            .ok_or_else(|| KernelError::UnknownScheduler(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&Self::normalize(name))
    }

    /// Canonical names in registration order
    pub fn names(&self) -> &[&'static str] {
        &self.canonical
    }
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::PcbAttributes;
    use std::time::Duration;

    fn pcb(priority: i64, burst_ms: u64) -> Arc<Pcb> {
        let pcb = Pcb::from_attributes(&PcbAttributes::new("x = 1").with_priority(priority)).unwrap();
        if burst_ms > 0 {
            // One burst b leaves an estimate of b / 2.
            pcb.add_last_burst(Duration::from_millis(burst_ms * 2));
        }
        Arc::new(pcb)
    }

    fn drain(policy: &mut dyn SchedulerPolicy, queue: &mut ReadyQueue) -> Vec<Arc<Pcb>> {
        let mut order = Vec::new();
        while let Some(pcb) = policy.schedule_next(queue) {
            order.push(pcb);
        }
        order
    }

    #[test]
    fn test_empty_queue_returns_none() {
        let mut queue = ReadyQueue::new();
        assert!(RoundRobin.schedule_next(&mut queue).is_none());
        assert!(ShortestJobFirst.schedule_next(&mut queue).is_none());
        assert!(PriorityFirst.schedule_next(&mut queue).is_none());
    }

    #[test]
    fn test_round_robin_is_fifo() {
        let pcbs = vec![pcb(9, 50), pcb(1, 1), pcb(5, 0)];
        let mut queue: ReadyQueue = pcbs.iter().cloned().collect();
        let order = drain(&mut RoundRobin, &mut queue);
        let expected: Vec<_> = pcbs.iter().map(|p| p.pid()).collect();
        assert_eq!(order.iter().map(|p| p.pid()).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_sjf_drains_in_burst_order_stable() {
        let a = pcb(1, 30);
        let b = pcb(1, 10);
        let c = pcb(1, 30);
        let d = pcb(1, 0);
        let mut queue: ReadyQueue = [&a, &b, &c, &d].into_iter().cloned().collect();

        let order = drain(&mut ShortestJobFirst, &mut queue);
        let pids: Vec<_> = order.iter().map(|p| p.pid()).collect();
        assert_eq!(pids, vec![d.pid(), b.pid(), a.pid(), c.pid()]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_priority_drains_in_priority_order_stable() {
        let a = pcb(3, 0);
        let b = pcb(1, 0);
        let c = pcb(3, 0);
        let d = pcb(-2, 0);
        let mut queue: ReadyQueue = [&a, &b, &c, &d].into_iter().cloned().collect();

        let order = drain(&mut PriorityFirst, &mut queue);
        let keys: Vec<i64> = order.iter().map(|p| p.priority()).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        let pids: Vec<_> = order.iter().map(|p| p.pid()).collect();
        assert_eq!(pids, vec![d.pid(), b.pid(), a.pid(), c.pid()]);
    }

    #[test]
    fn test_selection_removes_only_winner() {
        let a = pcb(2, 0);
        let b = pcb(1, 0);
        let c = pcb(3, 0);
        let mut queue: ReadyQueue = [&a, &b, &c].into_iter().cloned().collect();
        let chosen = PriorityFirst.schedule_next(&mut queue).unwrap();
        assert_eq!(chosen.pid(), b.pid());
        let rest: Vec<_> = queue.iter().map(|p| p.pid()).collect();
        assert_eq!(rest, vec![a.pid(), c.pid()]);
    }

    #[test]
    fn test_registry_lookup_and_aliases() {
        let registry = SchedulerRegistry::new();
        assert_eq!(registry.create("round_robin").unwrap().name(), "round_robin");
        assert_eq!(registry.create("RoundRobin").unwrap().name(), "round_robin");
        assert_eq!(registry.create("SJFScheduler").unwrap().name(), "shortest_job_first");
        assert_eq!(registry.create("sjf").unwrap().name(), "shortest_job_first");
        assert_eq!(registry.create("PrioritySJFScheduler").unwrap().name(), "priority");
        assert_eq!(
            registry.names(),
            &["round_robin", "shortest_job_first", "priority"]
        );
    }

    #[test]
    fn test_every_builtin_alias_resolves() {
        let registry = SchedulerRegistry::new();
        for (alias, name) in [
            ("rr", "round_robin"),
            ("RoundRobinScheduler", "round_robin"),
            ("sjf", "shortest_job_first"),
            ("SJFScheduler", "shortest_job_first"),
            ("priority_first", "priority"),
            ("PrioritySJFScheduler", "priority"),
        ] {
            assert!(registry.contains(alias), "{} missing", alias);
            assert_eq!(registry.create(alias).unwrap().name(), name);
        }
        assert_eq!(registry.names().len(), 3);
    }

    #[test]
    fn test_registry_rejects_unknown() {
        let registry = SchedulerRegistry::new();
        let err = registry.create("Lottery").err().unwrap();
        assert_eq!(err, KernelError::UnknownScheduler("Lottery".to_string()));
        assert!(!registry.contains("Lottery"));
    }

    #[test]
    fn test_register_custom_policy() {
        struct Newest;
        fn newest() -> Box<dyn SchedulerPolicy> {
            Box::new(Newest)
        }
        impl SchedulerPolicy for Newest {
            fn name(&self) -> &'static str {
                "newest"
            }
            fn schedule_next(&mut self, queue: &mut ReadyQueue) -> Option<Arc<Pcb>> {
                let last = queue.len().checked_sub(1)?;
                queue.remove_at(last)
            }
        }

        let mut registry = SchedulerRegistry::empty();
        assert_eq!(registry.register(newest), "newest");
        assert!(registry.alias("lifo", "newest").is_ok());
        assert!(registry.alias("x", "missing").is_err());

        let a = pcb(1, 0);
        let b = pcb(1, 0);
        let mut queue: ReadyQueue = [&a, &b].into_iter().cloned().collect();
        let mut policy = registry.create("LIFO").unwrap();
        assert_eq!(policy.schedule_next(&mut queue).unwrap().pid(), b.pid());
    }
}
