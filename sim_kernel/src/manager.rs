//! # Manager
//!
//! The kernel orchestrator. It owns the waiting, ready and running queues
//! and the scheduler policy, dispatches tasks one quota window at a time,
//! and runs the auto-dispatch and output-device loops.
//!
//! ## Locking
//!
//! - One queue lock guards all three queues, the policy and the event
//!   audit. Every cross-queue move happens inside it.
//! - A dispatch gate serialises whole [`Manager::execute`] calls, so the
//!   running queue never holds more than one process even when the
//!   foreground and the auto-dispatcher race.
//! - A task is resumed outside the queue lock. Its `out` syscall re-enters
//!   the kernel and takes the queue lock itself.
//!
//! ## Process states
//!
//! ```text
//! NEW -> READY -> RUNNING -> READY      quota expired, body alive
//!                         -> WAITING    output syscall
//!                         -> (dropped)  body finished or faulted
//!        WAITING -> READY               output device only
//! ```

use crate::config::KernelConfig;
use crate::device::BackgroundLoop;
use crate::error::TaskFault;
use crate::events::{EventLog, KernelEvent, KernelEventKind};
use crate::list::List;
use crate::pcb::{Pcb, PcbAttributes, PcbStats};
use crate::scheduler::{SchedulerPolicy, SchedulerRegistry};
use crate::snapshot::QueueSnapshot;
use crate::sync::lock;
use core_types::Pid;
use kernel_api::{KernelError, OutputSink, Quota, SysCall, SysCallKind, SysCallSink};
use services_logger::{LogEntry, LogLevel};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LOG_TARGET: &str = "sim_kernel::manager";

/// Result of one dispatch step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Ready was empty; nothing ran
    Idle,
    /// Quota window ended with the body still alive; back in ready
    Requeued(Pid),
    /// The task issued an output syscall and now sits in waiting
    Blocked(Pid),
    /// The body finished; the process is gone
    Completed(Pid),
    /// The body raised a fault; the process is gone
    Faulted(Pid),
}

impl ExecuteOutcome {
    /// The process that ran, if any
    pub fn pid(&self) -> Option<Pid> {
        match self {
            ExecuteOutcome::Idle => None,
            ExecuteOutcome::Requeued(pid)
            | ExecuteOutcome::Blocked(pid)
            | ExecuteOutcome::Completed(pid)
            | ExecuteOutcome::Faulted(pid) => Some(*pid),
        }
    }
}

struct Queues {
    waiting: List<Arc<Pcb>>,
    ready: List<Arc<Pcb>>,
    running: List<Arc<Pcb>>,
    scheduler: Box<dyn SchedulerPolicy>,
    events: EventLog,
}

impl Queues {
    fn find(&self, pid: Pid) -> Option<Arc<Pcb>> {
        self.ready
            .find(|pcb| pcb.pid() == pid)
            .or_else(|| self.running.find(|pcb| pcb.pid() == pid))
            .or_else(|| self.waiting.find(|pcb| pcb.pid() == pid))
            .cloned()
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            waiting: self.waiting.iter().map(|pcb| pcb.summary()).collect(),
            ready: self.ready.iter().map(|pcb| pcb.summary()).collect(),
            running: self.running.iter().map(|pcb| pcb.summary()).collect(),
        }
    }
}

/// State shared between the manager handle, its loops and its tasks
struct Kernel {
    queues: Mutex<Queues>,
    dispatch: Mutex<()>,
    quantum: Mutex<Quota>,
    output_delay_ms: AtomicU64,
    auto_scheduling: AtomicBool,
    halted: AtomicBool,
    registry: SchedulerRegistry,
    sink: Arc<dyn OutputSink>,
}

fn log_transition(level: LogLevel, pcb: &Pcb, message: &str) {
    let entry = LogEntry::new(level, message)
        .with_source(pcb.pid())
        .with_field("priority", pcb.priority());
    services_logger::emit(LOG_TARGET, &entry);
}

impl Kernel {
    fn quantum(&self) -> Quota {
        *lock(&self.quantum)
    }

    fn output_delay(&self) -> Duration {
        Duration::from_millis(self.output_delay_ms.load(Ordering::SeqCst))
    }

    fn add_task(self: &Arc<Self>, pcb: Pcb) -> Pid {
        pcb.task().bind(self);
        let pcb = Arc::new(pcb);
        let pid = pcb.pid();

        let mut queues = lock(&self.queues);
        queues.ready.push(pcb.clone());
        queues.events.record(pid, KernelEventKind::Admitted);
        drop(queues);

        log_transition(LogLevel::Info, &pcb, "admitted");
        pid
    }

    fn remove_task(&self, pid: Pid) -> bool {
        let mut queues = lock(&self.queues);
        let removed = queues.ready.delete_if(|pcb| pcb.pid() == pid) > 0;
        if removed {
            queues.events.record(pid, KernelEventKind::Removed);
            log::info!(target: LOG_TARGET, "removed {} from ready", pid);
        }
        removed
    }

    fn dispatch<F>(&self, inspect: Option<F>) -> ExecuteOutcome
    where
        F: FnOnce(&QueueSnapshot),
    {
        let _gate = lock(&self.dispatch);

        let selected = {
            let mut guard = lock(&self.queues);
            let queues = &mut *guard;
            // Checked under the queue lock so shutdown's preemption sees
            // anything selected before the flag was raised.
            if self.halted.load(Ordering::SeqCst) {
                None
            } else {
                let selected = queues.scheduler.schedule_next(&mut queues.ready);
                if let Some(pcb) = &selected {
                    queues.running.push(pcb.clone());
                    pcb.task().set_quota(self.quantum());
                    queues.events.record(pcb.pid(), KernelEventKind::Dispatched);
                }
                selected
            }
        };

        if let Some(inspect) = inspect {
            inspect(&self.snapshot());
        }

        let Some(pcb) = selected else {
            return ExecuteOutcome::Idle;
        };
        log_transition(LogLevel::Debug, &pcb, "dispatched");

        let result = pcb.task().resume();
        self.end_execution(&pcb, result)
    }

    fn end_execution(&self, pcb: &Arc<Pcb>, result: Result<bool, TaskFault>) -> ExecuteOutcome {
        let pid = pcb.pid();
        let mut queues = lock(&self.queues);
        let was_running = queues.running.delete_if(|other| Arc::ptr_eq(other, pcb)) > 0;

        match result {
            // `out` already moved it to waiting and recorded the burst.
            Ok(_) if !was_running => ExecuteOutcome::Blocked(pid),
            Ok(alive) => {
                pcb.add_last_burst(pcb.task().elapsed());
                if alive {
                    pcb.task().set_can_exec(true);
                    queues.ready.push(pcb.clone());
                    queues.events.record(pid, KernelEventKind::Requeued);
                    drop(queues);
                    log_transition(LogLevel::Debug, pcb, "requeued");
                    ExecuteOutcome::Requeued(pid)
                } else {
                    queues.events.record(pid, KernelEventKind::Completed);
                    drop(queues);
                    log_transition(LogLevel::Debug, pcb, "completed");
                    ExecuteOutcome::Completed(pid)
                }
            }
            Err(fault) => {
                queues.events.record(
                    pid,
                    KernelEventKind::Faulted {
                        reason: fault.to_string(),
                    },
                );
                drop(queues);
                let entry = LogEntry::new(LogLevel::Error, "program exited with error")
                    .with_source(pid)
                    .with_field("fault", &fault);
                services_logger::emit(LOG_TARGET, &entry);
                ExecuteOutcome::Faulted(pid)
            }
        }
    }

    /// One output-device step: waiting head back to ready, then emit
    fn complete_io(&self) -> Option<Pid> {
        let (pcb, sys_call) = {
            let mut queues = lock(&self.queues);
            let pcb = queues.waiting.pop()?;
            pcb.task().set_can_exec(true);
            queues.ready.push(pcb.clone());
            queues.events.record(pcb.pid(), KernelEventKind::Unblocked);
            let sys_call = pcb.sys_call();
            (pcb, sys_call)
        };

        log_transition(LogLevel::Debug, &pcb, "unblocked");
        if let Some(SysCall {
            kind: SysCallKind::Output,
            payload,
        }) = sys_call
        {
            self.sink.emit(pcb.pid(), &payload);
        }
        Some(pcb.pid())
    }

    fn auto_dispatch_tick(&self) {
        if !self.auto_scheduling.load(Ordering::SeqCst) {
            return;
        }
        let idle = lock(&self.queues).running.is_empty();
        if idle {
            self.dispatch(None::<fn(&QueueSnapshot)>);
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        lock(&self.queues).snapshot()
    }

    fn preempt_running(&self) {
        let queues = lock(&self.queues);
        queues.running.for_each(|pcb| pcb.task().set_can_exec(false));
    }
}

impl SysCallSink for Kernel {
    fn out(&self, payload: String) {
        let mut queues = lock(&self.queues);
        let Some(pcb) = queues.running.pop() else {
            log::warn!(target: LOG_TARGET, "output syscall with nothing running: {}", payload);
            return;
        };

        pcb.add_last_burst(pcb.task().elapsed());
        pcb.task().set_can_exec(false);
        pcb.set_sys_call(SysCall::output(payload));
        queues.waiting.push(pcb.clone());
        queues.events.record(pcb.pid(), KernelEventKind::Blocked);
        drop(queues);

        log_transition(LogLevel::Debug, &pcb, "blocked on output");
    }
}

/// The kernel orchestrator
///
/// Background loops start at construction and stop on [`Manager::shutdown`]
/// or drop.
pub struct Manager {
    kernel: Arc<Kernel>,
    loops: Mutex<Vec<BackgroundLoop>>,
}

impl Manager {
    /// Creates a manager with the built-in scheduler policies
    pub fn new(config: KernelConfig, sink: Arc<dyn OutputSink>) -> Result<Self, KernelError> {
        Self::with_registry(config, SchedulerRegistry::new(), sink)
    }

    /// Creates a manager that resolves policy names through `registry`
    pub fn with_registry(
        config: KernelConfig,
        registry: SchedulerRegistry,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, KernelError> {
        config.validate()?;
        let scheduler = registry.create(&config.scheduler)?;

        let kernel = Arc::new(Kernel {
            queues: Mutex::new(Queues {
                waiting: List::new(),
                ready: List::new(),
                running: List::new(),
                scheduler,
                events: EventLog::new(),
            }),
            dispatch: Mutex::new(()),
            quantum: Mutex::new(config.quantum),
            output_delay_ms: AtomicU64::new(config.output_delay_ms),
            auto_scheduling: AtomicBool::new(config.auto_scheduling),
            halted: AtomicBool::new(false),
            registry,
            sink,
        });

        let device = {
            let period_kernel = kernel.clone();
            let tick_kernel = kernel.clone();
            BackgroundLoop::spawn(
                "quanta-output-device",
                move || period_kernel.output_delay().max(Duration::from_millis(1)),
                move || {
                    tick_kernel.complete_io();
                },
            )?
        };
        let dispatcher = {
            let tick_kernel = kernel.clone();
            BackgroundLoop::spawn(
                "quanta-auto-dispatch",
                {
                    let tick = config.dispatch_tick();
                    move || tick
                },
                move || tick_kernel.auto_dispatch_tick(),
            )?
        };

        log::info!(
            target: LOG_TARGET,
            "kernel started: scheduler={} quantum={} output_delay_ms={} auto_scheduling={}",
            config.scheduler,
            config.quantum,
            config.output_delay_ms,
            config.auto_scheduling
        );

        Ok(Self {
            kernel,
            loops: Mutex::new(vec![device, dispatcher]),
        })
    }

    /// Admits a process to the ready queue
    pub fn add_task(&self, pcb: Pcb) -> Pid {
        self.kernel.add_task(pcb)
    }

    /// Builds a process from `attributes` and admits it
    pub fn load_task(&self, attributes: &PcbAttributes) -> Result<Pid, KernelError> {
        let pcb = Pcb::from_attributes(attributes)?;
        Ok(self.add_task(pcb))
    }

    /// Withdraws a process from ready
    ///
    /// Running and waiting processes are not affected. Returns whether a
    /// process was removed.
    pub fn remove_task(&self, pid: Pid) -> bool {
        self.kernel.remove_task(pid)
    }

    /// Finds a process in ready, then running, then waiting
    pub fn get_task(&self, pid: Pid) -> Option<Arc<Pcb>> {
        lock(&self.kernel.queues).find(pid)
    }

    /// Returns the diagnostic dump of a process
    pub fn task_stats(&self, pid: Pid) -> Result<PcbStats, KernelError> {
        self.get_task(pid)
            .map(|pcb| pcb.stats())
            .ok_or(KernelError::TaskNotFound(pid))
    }

    /// Runs one dispatch step
    pub fn execute(&self) -> ExecuteOutcome {
        self.kernel.dispatch(None::<fn(&QueueSnapshot)>)
    }

    /// Runs one dispatch step, showing `inspect` the queues right after
    /// selection
    ///
    /// `inspect` is called even when there is nothing to dispatch.
    pub fn execute_with<F>(&self, inspect: F) -> ExecuteOutcome
    where
        F: FnOnce(&QueueSnapshot),
    {
        self.kernel.dispatch(Some(inspect))
    }

    /// Runs one output-device step on demand
    ///
    /// Returns the process moved back to ready, if any.
    pub fn complete_io(&self) -> Option<Pid> {
        self.kernel.complete_io()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.kernel.snapshot()
    }

    /// Renders the three queues as `(pid | priority | cpu | created_at)` lists
    pub fn display_queues(&self) -> String {
        self.snapshot().to_string()
    }

    /// Swaps the scheduler policy
    ///
    /// An unknown name is rejected and the current policy stays active.
    pub fn set_scheduler(&self, name: &str) -> Result<(), KernelError> {
        let policy = match self.kernel.registry.create(name) {
            Ok(policy) => policy,
            Err(err) => {
                log::warn!(target: LOG_TARGET, "{}", err);
                return Err(err);
            }
        };
        let policy_name = policy.name();
        lock(&self.kernel.queues).scheduler = policy;
        log::info!(target: LOG_TARGET, "scheduler set to {}", policy_name);
        Ok(())
    }

    /// Canonical name of the active policy
    pub fn scheduler_name(&self) -> &'static str {
        lock(&self.kernel.queues).scheduler.name()
    }

    pub fn scheduler_names(&self) -> &[&'static str] {
        self.kernel.registry.names()
    }

    /// Sets the quota applied from the next dispatch on
    pub fn set_quantum(&self, quantum: Quota) {
        *lock(&self.kernel.quantum) = quantum;
        log::info!(target: LOG_TARGET, "quantum set to {}", quantum);
    }

    pub fn quantum(&self) -> Quota {
        self.kernel.quantum()
    }

    /// Sets the output device latency; applies from its next tick
    pub fn set_output_delay(&self, millis: u64) {
        self.kernel.output_delay_ms.store(millis, Ordering::SeqCst);
        log::info!(target: LOG_TARGET, "output delay set to {}ms", millis);
    }

    pub fn output_delay(&self) -> Duration {
        self.kernel.output_delay()
    }

    pub fn set_auto_scheduling(&self, enabled: bool) {
        self.kernel.auto_scheduling.store(enabled, Ordering::SeqCst);
        log::info!(target: LOG_TARGET, "automatic scheduling {}", if enabled { "on" } else { "off" });
    }

    pub fn auto_scheduling(&self) -> bool {
        self.kernel.auto_scheduling.load(Ordering::SeqCst)
    }

    /// Returns the audit trail, oldest first
    pub fn events(&self) -> Vec<KernelEvent> {
        lock(&self.kernel.queues).events.events()
    }

    /// Returns the transitions of one process, oldest first
    pub fn events_for(&self, pid: Pid) -> Vec<KernelEventKind> {
        lock(&self.kernel.queues).events.kinds_for(pid)
    }

    /// Stops both loops and preempts the running task
    ///
    /// Idempotent. Later `execute` calls dispatch nothing.
    pub fn shutdown(&self) {
        if self.kernel.halted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.kernel.preempt_running();
        let mut loops = lock(&self.loops);
        for worker in loops.iter_mut() {
            worker.stop();
        }
        loops.clear();
        log::info!(target: LOG_TARGET, "kernel stopped");
    }

    pub fn is_halted(&self) -> bool {
        self.kernel.halted.load(Ordering::SeqCst)
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
