//! Trace replay

use crate::report::Report;
use crate::strategy::FitStrategy;
use crate::trace::{MemoryTask, Space, Trace};

/// A process and the memory it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub task: MemoryTask,
    pub space: Space,
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    pub strategy: &'static str,
    pub mem_size: u64,
    pub assigned: Vec<Allocation>,
    pub blocked: Vec<MemoryTask>,
    /// Free spaces left after the run
    pub remaining: Vec<Space>,
}

impl Simulation {
    pub fn used_memory(&self) -> u64 {
        self.assigned.iter().map(|a| a.space.size).sum()
    }

    pub fn report(&self) -> Report {
        Report::from_simulation(self)
    }
}

pub struct Simulator {
    strategy: Box<dyn FitStrategy>,
}

impl Simulator {
    pub fn new(strategy: Box<dyn FitStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &dyn FitStrategy {
        self.strategy.as_ref()
    }

    pub fn set_strategy(&mut self, strategy: Box<dyn FitStrategy>) {
        self.strategy = strategy;
    }

    /// Places every process of `trace` in arrival order
    ///
    /// Processes arriving together keep their trace order. An allocation
    /// takes the front of the chosen space; a process nothing fits is
    /// blocked and never retried.
    pub fn run(&self, trace: &Trace) -> Simulation {
        let mut pending = trace.tasks.clone();
        pending.sort_by_key(|task| task.arrival);

        let mut spaces = trace.spaces.clone();
        let mut assigned = Vec::new();
        let mut blocked = Vec::new();

        for task in pending {
            match self.strategy.select(&spaces, task.mem_size) {
                Some(index) => {
                    let free = &mut spaces[index];
                    let space = Space::new(free.address, task.mem_size);
                    free.address += task.mem_size;
                    free.size -= task.mem_size;
                    log::debug!(
                        "{}: process {} at {} ({} units)",
                        self.strategy.name(),
                        task.pid,
                        space.address,
                        space.size
                    );
                    assigned.push(Allocation { task, space });
                }
                None => {
                    log::debug!(
                        "{}: process {} blocked, {} units do not fit",
                        self.strategy.name(),
                        task.pid,
                        task.mem_size
                    );
                    blocked.push(task);
                }
            }
        }

        Simulation {
            strategy: self.strategy.name(),
            mem_size: trace.mem_size,
            assigned,
            blocked,
            remaining: spaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{BestFit, FirstFit, WorstFit};

    fn trace() -> Trace {
        Trace::parse("1000\n2\n0,400\n500,500\n4\n1,0,10,300\n2,3,5,450\n3,1,8,200\n4,3,1,100\n")
            .unwrap()
    }

    fn pids(tasks: impl IntoIterator<Item = MemoryTask>) -> Vec<u64> {
        tasks.into_iter().map(|task| task.pid).collect()
    }

    #[test]
    fn test_first_fit_run() {
        let run = Simulator::new(Box::new(FirstFit)).run(&trace());

        // Arrival order: 1 (0), 3 (1), 2 (3), 4 (3)
        let placed: Vec<(u64, u64, u64)> = run
            .assigned
            .iter()
            .map(|a| (a.task.pid, a.space.address, a.space.size))
            .collect();
        assert_eq!(placed, vec![(1, 0, 300), (3, 500, 200), (4, 300, 100)]);
        assert_eq!(pids(run.blocked.clone()), vec![2]);
        assert_eq!(run.used_memory(), 600);
        assert_eq!(run.remaining, vec![Space::new(400, 0), Space::new(700, 300)]);
    }

    #[test]
    fn test_best_and_worst_fit_differ() {
        let best = Simulator::new(Box::new(BestFit)).run(&trace());
        let worst = Simulator::new(Box::new(WorstFit)).run(&trace());

        assert_eq!(best.assigned[0].space.address, 0);
        assert_eq!(worst.assigned[0].space.address, 500);
        assert_eq!(pids(worst.blocked.clone()), vec![2]);
    }

    #[test]
    fn test_trace_is_untouched() {
        let trace = trace();
        let before = trace.clone();
        let mut simulator = Simulator::new(Box::new(FirstFit));
        simulator.run(&trace);
        simulator.set_strategy(Box::new(WorstFit));
        assert_eq!(simulator.strategy().name(), "worst_fit");
        simulator.run(&trace);
        assert_eq!(trace, before);
    }
}
