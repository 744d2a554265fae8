//! Single-purpose delayed actions.
//!
//! A [`TimerSlot`] holds at most one pending action. Arming it again
//! invalidates whatever was pending, so "hide after a delay" requested twice
//! in a row hides once. Actions run on the current thread's tokio
//! [`LocalSet`](tokio::task::LocalSet); scheduling outside one panics.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::trace;

#[derive(Default)]
struct SlotState {
    generation: Cell<u64>,
    pending: Cell<bool>,
    handle: RefCell<Option<AbortHandle>>,
}

pub struct TimerSlot {
    name: String,
    state: Rc<SlotState>,
}

impl TimerSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Rc::new(SlotState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arm the slot. Any action still pending is cancelled first.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + 'static,
    {
        self.invalidate();

        let generation = self.state.generation.get();
        let state = Rc::downgrade(&self.state);
        let name = self.name.clone();
        self.state.pending.set(true);

        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;

            let Some(state) = state.upgrade() else {
                return;
            };
            if state.generation.get() != generation {
                return;
            }
            state.pending.set(false);
            state.handle.borrow_mut().take();
            drop(state);

            trace!("⏰ Timer {} fired", name);
            action();
        });

        *self.state.handle.borrow_mut() = Some(task.abort_handle());
    }

    /// Arm the slot with an action on `target` that is skipped if the target
    /// has been dropped by the time the delay elapses.
    pub fn schedule_for<T, F>(&self, delay: Duration, target: &Rc<T>, action: F)
    where
        T: 'static,
        F: FnOnce(&T) + 'static,
    {
        let target: Weak<T> = Rc::downgrade(target);
        self.schedule(delay, move || {
            if let Some(target) = target.upgrade() {
                action(&target);
            }
        });
    }

    /// Cancel the pending action, if any.
    pub fn invalidate(&self) {
        self.state.generation.set(self.state.generation.get() + 1);
        self.state.pending.set(false);
        if let Some(handle) = self.state.handle.borrow_mut().take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state.pending.get()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl std::fmt::Debug for TimerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerSlot")
            .field("name", &self.name)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::LocalSet;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_fires_only_once() {
        LocalSet::new()
            .run_until(async {
                let slot = TimerSlot::new("hide");
                let fired = counter();

                for _ in 0..2 {
                    let fired = fired.clone();
                    slot.schedule(Duration::from_millis(400), move || fired.set(fired.get() + 1));
                }
                assert!(slot.is_pending());

                tokio::time::sleep(Duration::from_secs(2)).await;
                assert_eq!(fired.get(), 1);
                assert!(!slot.is_pending());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_delay() {
        LocalSet::new()
            .run_until(async {
                let slot = TimerSlot::new("hide");
                let fired = counter();

                let f = fired.clone();
                slot.schedule(Duration::from_millis(400), move || f.set(f.get() + 1));
                tokio::time::sleep(Duration::from_millis(300)).await;

                let f = fired.clone();
                slot.schedule(Duration::from_millis(400), move || f.set(f.get() + 1));
                tokio::time::sleep(Duration::from_millis(300)).await;
                assert_eq!(fired.get(), 0);

                tokio::time::sleep(Duration::from_millis(200)).await;
                assert_eq!(fired.get(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_cancels_pending_action() {
        LocalSet::new()
            .run_until(async {
                let slot = TimerSlot::new("hide");
                let fired = counter();

                let f = fired.clone();
                slot.schedule(Duration::from_millis(100), move || f.set(f.get() + 1));
                slot.invalidate();

                tokio::time::sleep(Duration::from_secs(1)).await;
                assert_eq!(fired.get(), 0);
                assert!(!slot.is_pending());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn action_is_skipped_once_target_is_gone() {
        LocalSet::new()
            .run_until(async {
                let slot = TimerSlot::new("hide");
                let fired = counter();
                let target = Rc::new(fired.clone());

                slot.schedule_for(Duration::from_millis(100), &target, |fired| {
                    fired.set(fired.get() + 1)
                });
                drop(target);

                tokio::time::sleep(Duration::from_secs(1)).await;
                assert_eq!(fired.get(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_slot_cancels_it() {
        LocalSet::new()
            .run_until(async {
                let fired = counter();
                {
                    let slot = TimerSlot::new("hide");
                    let f = fired.clone();
                    slot.schedule(Duration::from_millis(100), move || f.set(f.get() + 1));
                }

                tokio::time::sleep(Duration::from_secs(1)).await;
                assert_eq!(fired.get(), 0);
            })
            .await;
    }
}
