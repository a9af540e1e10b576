//! Debounced reveal of freshly opened blocks.
//!
//! Each [`FadeScheduler::schedule`] call cancels the outstanding timer and
//! starts a new one, so the reveal fires one quiet period after the *last*
//! call. A generation counter guards against a superseded timer firing
//! anyway. Which elements get revealed is decided by [`RevealPolicy`].

use crate::dom::{ElementId, SharedDocument};
use crate::event_loop::{EventLoop, TimerHandle};
use crate::options::{MaterializeOptions, RevealPolicy};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Default)]
struct FadeState {
    pending: VecDeque<ElementId>,
    timer: Option<TimerHandle>,
    generation: u64,
}

#[derive(Debug)]
pub struct FadeScheduler {
    state: Rc<RefCell<FadeState>>,
    document: SharedDocument,
    event_loop: EventLoop,
    quiet_period: Duration,
    policy: RevealPolicy,
    revealed_class: Rc<str>,
}

impl FadeScheduler {
    pub fn new(document: SharedDocument, event_loop: EventLoop, options: &MaterializeOptions) -> Self {
        Self {
            state: Rc::default(),
            document,
            event_loop,
            quiet_period: options.quiet_period,
            policy: options.policy,
            revealed_class: Rc::from(options.revealed_class.as_str()),
        }
    }

    /// Queues `element` for reveal and restarts the quiet period.
    ///
    /// The document must not be borrowed by the caller.
    pub fn schedule(&self, element: ElementId) {
        let overflow = {
            let mut state = self.state.borrow_mut();
            if let Some(timer) = state.timer.take() {
                self.event_loop.clear_timeout(timer);
            }
            state.generation += 1;
            self.enqueue(&mut state, element)
        };
        for element in overflow {
            reveal(&self.document, element, &self.revealed_class);
        }

        let generation = self.state.borrow().generation;
        let state = Rc::downgrade(&self.state);
        let document = self.document.clone();
        let class = self.revealed_class.clone();
        let handle = self.event_loop.set_timeout(self.quiet_period, move || {
            let Some(state) = state.upgrade() else {
                return;
            };
            let ready: Vec<ElementId> = {
                let mut state = state.borrow_mut();
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                state.pending.drain(..).collect()
            };
            log::debug!("quiet period elapsed, revealing {} element(s)", ready.len());
            for element in ready {
                reveal(&document, element, &class);
            }
        });
        self.state.borrow_mut().timer = Some(handle);
    }

    /// Records `element` according to the policy; returns elements that must
    /// be revealed right away.
    fn enqueue(&self, state: &mut FadeState, element: ElementId) -> Vec<ElementId> {
        match self.policy {
            RevealPolicy::LastWins => {
                for abandoned in state.pending.drain(..).filter(|p| *p != element) {
                    log::debug!("{abandoned} superseded by {element}, it will not be revealed");
                }
                state.pending.push_back(element);
                Vec::new()
            }
            RevealPolicy::Batch { max_pending } => {
                if !state.pending.contains(&element) {
                    state.pending.push_back(element);
                }
                let mut overflow = Vec::new();
                while state.pending.len() > max_pending.max(1) {
                    overflow.extend(state.pending.pop_front());
                }
                overflow
            }
        }
    }

    /// Elements waiting for the timer, oldest first.
    pub fn pending(&self) -> Vec<ElementId> {
        self.state.borrow().pending.iter().copied().collect()
    }

    /// `true` when no timer is outstanding.
    pub fn is_idle(&self) -> bool {
        self.state.borrow().timer.is_none()
    }

    /// Reveals everything pending now and cancels the timer. Returns how many
    /// elements were revealed.
    pub fn flush(&self) -> usize {
        let ready = self.take_pending();
        ready
            .into_iter()
            .filter(|el| reveal(&self.document, *el, &self.revealed_class))
            .count()
    }

    /// Drops the timer and everything pending without revealing it.
    pub fn cancel(&self) {
        let dropped = self.take_pending();
        if !dropped.is_empty() {
            log::debug!("cancelled reveal of {} element(s)", dropped.len());
        }
    }

    fn take_pending(&self) -> Vec<ElementId> {
        let mut state = self.state.borrow_mut();
        if let Some(timer) = state.timer.take() {
            self.event_loop.clear_timeout(timer);
        }
        state.generation += 1;
        state.pending.drain(..).collect()
    }
}

impl Drop for FadeScheduler {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut()
            && let Some(timer) = state.timer.take()
        {
            self.event_loop.clear_timeout(timer);
        }
    }
}

/// Adds the revealed class unless the element left the document meanwhile.
fn reveal(document: &SharedDocument, element: ElementId, class: &str) -> bool {
    let mut doc = document.borrow_mut();
    if !doc.is_connected(element) {
        log::debug!("{element} detached before its reveal, skipping");
        return false;
    }
    match doc.add_class(element, class) {
        Ok(_) => {
            log::trace!("revealed {element}");
            true
        }
        Err(err) => {
            log::warn!("reveal failed: {err}");
            false
        }
    }
}
