// ============================================================================
// scope-digest - Deferred Scheduling
// The host primitive behind eval_async's self-trigger and apply_async's flush
// ============================================================================
//
// The engine needs exactly one capability from its environment: "run this
// task once, after the current synchronous work unwinds". In a browser that
// would be a zero-delay timer; in Rust there is no ambient microtask queue,
// so the primitive is a trait the host implements and the crate ships an
// explicit-flush queue for hosts (and tests) that pump manually.
//
// Deferred tasks return Result so a runaway digest raised inside a
// self-triggered digest surfaces to whoever pumps the queue.
// =============================================================================

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::core::types::ScopeError;

/// A task deferred to run once after the current synchronous work.
pub type DeferredTask = Box<dyn FnOnce() -> Result<(), ScopeError>>;

// =============================================================================
// SCHEDULER
// =============================================================================

/// The single primitive the engine requires from its host environment.
///
/// Contract: the task runs at most once, never synchronously inside `defer`,
/// and eventually (once the host pumps its queue / its event loop turns).
pub trait Scheduler {
    /// Queue a task to run once, after the current synchronous work unwinds.
    fn defer(&self, task: DeferredTask);
}

// =============================================================================
// TASK QUEUE
// =============================================================================

/// A single-threaded deferred-task queue with an explicit pump.
///
/// This is the default host primitive: `defer` only queues, and the owner
/// decides when "after the current synchronous work" is by calling
/// [`drain`](TaskQueue::drain). Embedders with a real event loop can
/// implement [`Scheduler`] over their own deferral mechanism instead.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use scope_digest::{Scope, TaskQueue};
///
/// let host = Rc::new(TaskQueue::new());
/// let scope = Scope::with_scheduler(host.clone());
///
/// scope.eval_async(|s| s.set("ran", true));
/// assert!(scope.get("ran").is_undefined());
///
/// // The host pumps its queue; the self-triggered digest runs the task.
/// host.drain().unwrap();
/// assert_eq!(scope.get("ran").as_bool(), Some(true));
/// ```
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<DeferredTask>>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run queued tasks until the queue is empty.
    ///
    /// Tasks may defer further tasks; those run in the same drain. The first
    /// task error stops the drain and propagates, leaving later tasks queued.
    pub fn drain(&self) -> Result<(), ScopeError> {
        loop {
            // Take one task at a time; a running task may defer more.
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task()?,
                None => return Ok(()),
            }
        }
    }
}

impl Scheduler for TaskQueue {
    fn defer(&self, task: DeferredTask) {
        self.tasks.borrow_mut().push_back(task);
    }
}

// =============================================================================
// TESTS
// =============================================================================
