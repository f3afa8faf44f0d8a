// ============================================================================
// scope-digest - Digest Loop and Async Queues
// The convergence algorithm, early exit, runaway guard, and deferred tasks
// ============================================================================
//
// digest() repeats full passes over the watchers until a pass finds nothing
// dirty and no async work is queued. Within a pass, watchers run in
// registration order; a pass stops early once it makes a clean full circuit
// back to the last dirty watcher. A countdown bounds the outer loop so
// circularly-dependent watchers fail loudly instead of spinning.
// =============================================================================

use std::rc::{Rc, Weak};

use crate::core::constants::MAX_DIGEST_ITERATIONS;
use crate::core::types::{Phase, ScopeError};
use crate::reactivity::equality;

use super::{AsyncTask, Scope, Watcher};

impl Scope {
    // =========================================================================
    // DIGEST
    // =========================================================================

    /// Re-evaluate all watchers until none report a change, invoking
    /// listeners for everything that changed.
    ///
    /// Queued `eval_async` tasks are drained before every pass; a scheduled
    /// `apply_async` flush is cancelled and absorbed so it cannot trigger a
    /// redundant digest later. Fails with [`ScopeError::RunawayDigest`] when
    /// the watchers never converge, and with
    /// [`ScopeError::PhaseInProgress`] when a digest or apply is already
    /// running on this scope.
    ///
    /// # Example
    /// ```
    /// use scope_digest::Scope;
    ///
    /// let scope = Scope::new();
    /// scope.set("count", 1.0);
    ///
    /// scope.watch_key("count", |new, old, s| {
    ///     // On the first run old == new, never a sentinel.
    ///     assert_eq!(old.as_number(), new.as_number());
    ///     s.set("fired", true);
    /// });
    ///
    /// scope.digest().unwrap();
    /// assert_eq!(scope.get("fired").as_bool(), Some(true));
    /// ```
    pub fn digest(&self) -> Result<(), ScopeError> {
        let _guard = self.begin_phase(Phase::Digest)?;
        *self.inner.last_dirty_watch.borrow_mut() = None;

        // Absorb a pending deferred apply: this digest incorporates the
        // queued changes and the scheduled flush becomes a no-op.
        if self.inner.apply_async_scheduled.replace(false) {
            self.flush_apply_async();
        }

        let mut budget = MAX_DIGEST_ITERATIONS;
        loop {
            self.drain_async_queue();

            let dirty = self.digest_once();
            let async_pending = !self.inner.async_queue.borrow().is_empty();
            if !dirty && !async_pending {
                break;
            }

            if budget == 0 {
                // Drop the queue so a stale self-trigger cannot replay it.
                self.inner.async_queue.borrow_mut().clear();
                return Err(ScopeError::RunawayDigest {
                    iterations: MAX_DIGEST_ITERATIONS,
                });
            }
            budget -= 1;
        }

        self.inner.watchers.borrow_mut().retain(|w| w.active.get());
        Ok(())
    }

    /// One pass over the registry. Returns whether any watcher was dirty.
    fn digest_once(&self) -> bool {
        let mut dirty = false;
        let mut index = 0;
        loop {
            // Re-borrow per step: listeners may register or remove watchers
            // while the pass iterates. Appended watchers are visited if the
            // scan reaches them before an early exit.
            let watcher = {
                let watchers = self.inner.watchers.borrow();
                match watchers.get(index) {
                    Some(watcher) => Rc::clone(watcher),
                    None => break,
                }
            };
            index += 1;

            if !watcher.active.get() {
                continue;
            }

            let new_value = (watcher.watch_fn)(self);
            let changed = match watcher.last.borrow().as_ref() {
                Some(last) => !equality::values_equal(&new_value, last, watcher.value_eq),
                // Initial sentinel: a fresh watcher is always dirty once.
                None => true,
            };

            if changed {
                *self.inner.last_dirty_watch.borrow_mut() = Some(Rc::downgrade(&watcher));
                let previous = watcher
                    .last
                    .replace(Some(equality::snapshot(&new_value, watcher.value_eq)));
                // First fire: the listener sees old == new, not the sentinel.
                let old_value = previous.unwrap_or_else(|| new_value.clone());
                (watcher.listener_fn.borrow_mut())(&new_value, &old_value, self);
                dirty = true;
            } else if self.is_last_dirty_watch(&watcher) {
                // Clean full circuit since the last dirty watcher: the rest
                // of the registry cannot have changed either.
                break;
            }
        }
        dirty
    }

    fn is_last_dirty_watch(&self, watcher: &Rc<Watcher>) -> bool {
        self.inner
            .last_dirty_watch
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|last| Rc::ptr_eq(&last, watcher))
    }

    fn drain_async_queue(&self) {
        loop {
            // One at a time: a running task may enqueue further tasks, and
            // those must run before the pass starts.
            let task = self.inner.async_queue.borrow_mut().pop_front();
            match task {
                Some(task) => task(self),
                None => break,
            }
        }
    }

    // =========================================================================
    // EVAL ASYNC
    // =========================================================================

    /// Queue `f` to run during the current digest, or a self-triggered one.
    ///
    /// Never runs `f` synchronously at the call site. If a digest (or apply)
    /// is in progress the task is drained by it; otherwise a digest is
    /// deferred through the host scheduler, coalesced with any tasks queued
    /// before it runs.
    pub fn eval_async(&self, f: impl FnOnce(&Scope) + 'static) {
        let needs_trigger = self.inner.phase.get() == Phase::None
            && self.inner.async_queue.borrow().is_empty();

        if needs_trigger {
            let weak = Rc::downgrade(&self.inner);
            self.inner.scheduler.defer(Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return Ok(());
                };
                let pending = !inner.async_queue.borrow().is_empty();
                if pending {
                    Scope { inner }.digest()
                } else {
                    Ok(())
                }
            }));
        }

        self.inner.async_queue.borrow_mut().push_back(Box::new(f));
    }

    // =========================================================================
    // APPLY ASYNC
    // =========================================================================

    /// Queue `f` for a deferred apply on a later tick.
    ///
    /// Calls made before the flush runs are coalesced: the whole queue drains
    /// inside one `apply`, hence one digest. An ordinary digest that happens
    /// first absorbs the queue and cancels the scheduled flush.
    pub fn apply_async(&self, f: impl FnOnce(&Scope) + 'static) {
        self.inner.apply_async_queue.borrow_mut().push_back(Box::new(f));

        if !self.inner.apply_async_scheduled.replace(true) {
            let weak = Rc::downgrade(&self.inner);
            self.inner.scheduler.defer(Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return Ok(());
                };
                // Consumed marker means a digest already absorbed the queue.
                if !inner.apply_async_scheduled.replace(false) {
                    return Ok(());
                }
                let scope = Scope { inner };
                scope.apply(|s| s.flush_apply_async()).map(|_| ())
            }));
        }
    }

    pub(crate) fn flush_apply_async(&self) {
        loop {
            let task: Option<AsyncTask> = self.inner.apply_async_queue.borrow_mut().pop_front();
            match task {
                Some(task) => task(self),
                None => break,
            }
        }
    }
}
