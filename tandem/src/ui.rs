//! Ordered queue of work that must run on the host's UI thread.
//!
//! Anything that mutates host-visible content is wrapped in a task and queued here. The
//! host drains the queue from its UI thread with [`UiQueue::run_pending`] before it
//! processes the next input event. Tasks run in submission order, so a task always sees
//! the effects of the ones queued before it. Timers are fire-once tasks that join the
//! queue when their deadline passes.

use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    panic::{self, AssertUnwindSafe},
    time::{Duration, Instant},
};

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

struct Timer {
    due: Instant,
    /// Submission order, to break ties between equal deadlines.
    seq: u64,
    task: UiTask,
}

#[derive(Default)]
struct UiQueueInner {
    ready: VecDeque<UiTask>,
    timers: Vec<Timer>,
    next_seq: u64,
}

#[derive(Default)]
pub struct UiQueue {
    inner: Mutex<UiQueueInner>,
}

impl UiQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to run on the next drain.
    pub fn defer(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.lock().ready.push_back(Box::new(task));
    }

    /// Queue `task` to run on the first drain at least `delay` from now.
    pub fn defer_after(&self, delay: Duration, task: impl FnOnce() + Send + 'static) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.timers.push(Timer {
            due: Instant::now() + delay,
            seq,
            task: Box::new(task),
        });
    }

    /// Run every ready task, and every timer due by now.
    pub fn run_pending(&self) -> usize {
        self.run_pending_at(Instant::now())
    }

    /// Run every ready task, and every timer due by `now`.
    ///
    /// Tasks queued while draining run in the same drain. A panicking task is logged and
    /// the drain goes on. Returns the number of tasks run.
    pub fn run_pending_at(&self, now: Instant) -> usize {
        let mut ran = 0;
        while let Some(task) = self.next_task(now) {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                tracing::error!("deferred ui task panicked");
            }
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!("ran {ran} deferred ui tasks");
        }
        ran
    }

    fn next_task(&self, now: Instant) -> Option<UiTask> {
        let mut inner = self.inner.lock();
        if let Some(task) = inner.ready.pop_front() {
            return Some(task);
        }
        let (index, _) = inner
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))?;
        Some(inner.timers.swap_remove(index).task)
    }

    /// Tasks and timers not yet run.
    pub fn pending(&self) -> usize {
        let inner = self.inner.lock();
        inner.ready.len() + inner.timers.len()
    }

    /// Earliest timer deadline, for hosts that sleep between drains.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner.lock().timers.iter().map(|timer| timer.due).min()
    }
}
