//! Single-threaded timer queue on a virtual clock.
//!
//! Stands in for the host event loop's `setTimeout`/`clearTimeout`. Time only
//! moves when the owner calls [`EventLoop::advance`] or
//! [`EventLoop::run_until_idle`], which keeps scheduling deterministic. Tasks
//! run on the calling thread, one at a time, in due-time order (ties broken by
//! registration order).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

type Task = Box<dyn FnOnce()>;

/// Handle to a scheduled task, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    due: Duration,
    id: u64,
}

#[derive(Default)]
struct LoopState {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<(Duration, u64), Task>,
}

/// Cheaply cloneable handle to one shared loop.
#[derive(Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the loop was created.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn set_timeout(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.timers.insert((due, id), Box::new(task));
        TimerHandle { due, id }
    }

    /// Cancels a task. Returns `false` if it already ran or was cancelled.
    pub fn clear_timeout(&self, handle: TimerHandle) -> bool {
        self.state
            .borrow_mut()
            .timers
            .remove(&(handle.due, handle.id))
            .is_some()
    }

    /// Moves the clock forward by `by`, running every task that falls due on
    /// the way, including tasks scheduled by those tasks. Returns the number of
    /// tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            ran += 1;
        }
        self.state.borrow_mut().now = target;
        ran
    }

    /// Runs tasks until none are left, moving the clock to each due time.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next_due = self.state.borrow().timers.keys().next().map(|(due, _)| *due);
            let Some(due) = next_due else {
                return ran;
            };
            while let Some(task) = self.pop_due(due) {
                task();
                ran += 1;
            }
        }
    }

    // The borrow is released before the task runs so tasks can schedule more.
    fn pop_due(&self, target: Duration) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        let (&(due, id), _) = state.timers.iter().next()?;
        if due > target {
            return None;
        }
        let task = state.timers.remove(&(due, id))?;
        let now = state.now.max(due);
        state.now = now;
        Some(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn runs_tasks_in_due_order() {
        let lp = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, name) in [(20, "b"), (10, "a"), (20, "c")] {
            let log = log.clone();
            lp.set_timeout(ms(delay), move || log.borrow_mut().push(name));
        }

        assert_eq!(lp.advance(ms(15)), 1);
        assert_eq!(*log.borrow(), vec!["a"]);
        assert_eq!(lp.advance(ms(5)), 2);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(lp.now(), ms(20));
    }

    #[test]
    fn cleared_tasks_never_run() {
        let lp = EventLoop::new();
        let hit = Rc::new(Cell::new(false));
        let flag = hit.clone();
        let handle = lp.set_timeout(ms(10), move || flag.set(true));

        assert!(lp.clear_timeout(handle));
        assert!(!lp.clear_timeout(handle));
        lp.advance(ms(50));
        assert!(!hit.get());
    }

    #[test]
    fn tasks_can_schedule_tasks() {
        let lp = EventLoop::new();
        let count = Rc::new(Cell::new(0));
        let inner_loop = lp.clone();
        let c = count.clone();
        lp.set_timeout(ms(5), move || {
            c.set(c.get() + 1);
            let c = c.clone();
            inner_loop.set_timeout(ms(5), move || c.set(c.get() + 1));
        });

        assert_eq!(lp.run_until_idle(), 2);
        assert_eq!(count.get(), 2);
        assert_eq!(lp.now(), ms(10));
        assert_eq!(lp.pending(), 0);
    }

    #[test]
    fn task_time_is_observable() {
        let lp = EventLoop::new();
        let seen = Rc::new(Cell::new(Duration::ZERO));
        let (inner, s) = (lp.clone(), seen.clone());
        lp.set_timeout(ms(7), move || s.set(inner.now()));
        lp.advance(ms(100));
        assert_eq!(seen.get(), ms(7));
        assert_eq!(lp.now(), ms(100));
    }
}
