//! # Task
//!
//! A resumable execution unit. The task owns an instrumented program and the
//! execution context that runs it; the context survives between dispatches,
//! so each quota window continues where the previous one stopped.
//!
//! ## Resume contract
//!
//! [`Task::resume`] stamps `scheduled_at`, then repeatedly advances one
//! statement and re-checks three conditions: the quota still allows the
//! elapsed time, the body has not finished, and `can_exec` is still set.
//! It stops as soon as one fails and reports whether the body is still
//! alive. A quota can be overshot by at most one statement.

use crate::error::{ScriptError, TaskFault};
use crate::instrumentation::{self, Op, Program};
use crate::script::{Env, Value};
use crate::sync::lock;
use kernel_api::{Quota, SysCallSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Suspended state of a running body
#[derive(Debug)]
pub struct Execution {
    program: Program,
    pc: usize,
    env: Env,
    finished: bool,
}

impl Execution {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            pc: 0,
            env: Env::new(),
            finished: false,
        }
    }

    /// Returns true once the body returned or ran off its end
    pub fn is_finished(&self) -> bool {
        self.finished || self.pc >= self.program.len()
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    /// Advances exactly one statement
    ///
    /// Runs ops until one suspension point is consumed or the body ends.
    pub fn step(&mut self, sys: Option<&dyn SysCallSink>) -> Result<(), TaskFault> {
        while !self.finished {
            let Some(instr) = self.program.get(self.pc) else {
                self.finished = true;
                break;
            };
            let line = instr.line;
            self.pc += 1;

            match &instr.op {
                Op::Yield => return Ok(()),
                Op::Assign { name, value } => {
                    let value = value.eval(&self.env, line)?;
                    self.env.insert(name.clone(), value);
                }
                Op::Out(expr) => {
                    let payload = expr.eval(&self.env, line)?.to_string();
                    let sys = sys.ok_or(TaskFault::Unbound { line })?;
                    sys.out(payload);
                }
                Op::Work(expr) => {
                    let value = expr.eval(&self.env, line)?;
                    let duration = match &value {
                        Value::Number(millis) => Duration::try_from_secs_f64(millis / 1000.0).ok(),
                        _ => None,
                    };
                    let Some(duration) = duration else {
                        return Err(TaskFault::InvalidWork {
                            line,
                            value: value.to_string(),
                        });
                    };
                    thread::sleep(duration);
                }
                Op::Fail(expr) => {
                    let message = expr.eval(&self.env, line)?.to_string();
                    self.finished = true;
                    return Err(TaskFault::Failed { line, message });
                }
                Op::Jump(target) => self.pc = *target,
                Op::JumpUnless { cond, target } => {
                    if !cond.eval(&self.env, line)?.is_truthy() {
                        self.pc = *target;
                    }
                }
                Op::Return => self.finished = true,
            }
        }
        Ok(())
    }
}

/// Cooperatively preemptible unit of work owned by a PCB
pub struct Task {
    execution: Mutex<Execution>,
    scheduled_at: Mutex<Option<Instant>>,
    quota: Mutex<Quota>,
    can_exec: AtomicBool,
    sys: Mutex<Option<Weak<dyn SysCallSink>>>,
}

impl Task {
    pub fn new(program: Program) -> Self {
        Self {
            execution: Mutex::new(Execution::new(program)),
            scheduled_at: Mutex::new(None),
            quota: Mutex::new(Quota::default()),
            can_exec: AtomicBool::new(true),
            sys: Mutex::new(None),
        }
    }

    /// Compiles `source` into an instrumented task
    pub fn from_source(source: &str) -> Result<Self, ScriptError> {
        Ok(Self::new(instrumentation::compile(source)?))
    }

    /// Routes this task's syscalls to `sink`
    ///
    /// Only a weak reference is kept; the kernel owns its tasks, not the
    /// other way round.
    pub fn bind<S: SysCallSink + 'static>(&self, sink: &Arc<S>) {
        let weak: Weak<S> = Arc::downgrade(sink);
        let weak: Weak<dyn SysCallSink> = weak;
        *lock(&self.sys) = Some(weak);
    }

    pub fn quota(&self) -> Quota {
        *lock(&self.quota)
    }

    pub fn set_quota(&self, quota: Quota) {
        *lock(&self.quota) = quota;
    }

    pub fn can_exec(&self) -> bool {
        self.can_exec.load(Ordering::SeqCst)
    }

    pub fn set_can_exec(&self, can_exec: bool) {
        self.can_exec.store(can_exec, Ordering::SeqCst);
    }

    /// When the current (or last) quota window started
    pub fn scheduled_at(&self) -> Option<Instant> {
        *lock(&self.scheduled_at)
    }

    /// Wall-clock time since the last dispatch
    pub fn elapsed(&self) -> Duration {
        self.scheduled_at()
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    /// Blocks while the task is being resumed
    pub fn is_finished(&self) -> bool {
        lock(&self.execution).is_finished()
    }

    /// Reads a variable of the body; blocks while the task is being resumed
    pub fn variable(&self, name: &str) -> Option<Value> {
        lock(&self.execution).variable(name).cloned()
    }

    /// Runs the body for one quota window
    ///
    /// Returns `Ok(true)` while statements remain for a later window and
    /// `Ok(false)` once the body has finished.
    pub fn resume(&self) -> Result<bool, TaskFault> {
        let started = Instant::now();
        *lock(&self.scheduled_at) = Some(started);
        let quota = self.quota();
        let sys = lock(&self.sys).as_ref().and_then(Weak::upgrade);

        let mut execution = lock(&self.execution);
        loop {
            execution.step(sys.as_deref())?;
            if execution.is_finished() || !self.can_exec() || !quota.allows(started.elapsed()) {
                break;
            }
        }
        Ok(!execution.is_finished())
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("quota", &self.quota())
            .field("can_exec", &self.can_exec())
            .field("scheduled_at", &self.scheduled_at())
            .finish_non_exhaustive()
    }
}
