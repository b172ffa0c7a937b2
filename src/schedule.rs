//! One-shot re-arming task scheduler.
//!
//! A [`Schedule`] holds a single event. Each [`Schedule::run`] fires the task
//! if its deadline has passed; the task answers with the delay until its next
//! firing, or `None` to stop for good.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Will fire once the deadline is reached.
    Armed(Instant),
    /// The task asked to stop; it never fires again.
    Done,
}

#[derive(Debug)]
pub struct Schedule {
    state: EventState,
}

impl Schedule {
    /// Creates a schedule whose task is due immediately.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(at: Instant) -> Self {
        Schedule {
            state: EventState::Armed(at),
        }
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == EventState::Done
    }

    /// Fires the task if it is due at `now` and re-arms it from its answer.
    ///
    /// Returns the time left until the next firing, or `None` once the task
    /// is done.
    pub fn run<F>(&mut self, now: Instant, task: F) -> Option<Duration>
    where
        F: FnOnce() -> Option<Duration>,
    {
        match self.state {
            EventState::Done => None,
            EventState::Armed(at) if now < at => Some(at - now),
            EventState::Armed(_) => match task() {
                Some(delay) => {
                    self.state = EventState::Armed(now + delay);
                    Some(delay)
                }
                None => {
                    self.state = EventState::Done;
                    None
                }
            },
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}
