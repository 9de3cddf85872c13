//! Frame scheduling.
//!
//! The render manager never flushes synchronously on mutation. It asks an
//! [`AnimationScheduler`] to run a job on the next frame and keeps the
//! returned [`Task`] so it can tell whether that frame is still outstanding.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

pub type FrameJob = Box<dyn FnOnce(Instant)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TaskState {
    Pending,
    Completed,
    Canceled,
}

/// Handle to a scheduled frame job.
#[derive(Clone, Debug)]
pub struct Task {
    state: Rc<Cell<TaskState>>,
}

impl Task {
    pub fn new() -> Self {
        Self {
            state: Rc::new(Cell::new(TaskState::Pending)),
        }
    }

    /// Prevent the job from running. No-op once the job has run.
    pub fn cancel(&self) {
        if self.state.get() == TaskState::Pending {
            self.state.set(TaskState::Canceled);
        }
    }

    /// True once the job ran or was canceled.
    pub fn is_completed(&self) -> bool {
        self.state.get() != TaskState::Pending
    }

    pub fn is_canceled(&self) -> bool {
        self.state.get() == TaskState::Canceled
    }

    /// Called by schedulers right before running the job. Returns `false`
    /// if the job must be skipped.
    pub fn begin(&self) -> bool {
        if self.state.get() == TaskState::Pending {
            self.state.set(TaskState::Completed);
            true
        } else {
            false
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

pub trait AnimationScheduler {
    /// Run `job` once, on the next frame.
    fn on_next_frame(&self, job: FrameJob) -> Task;
}

/// A scheduler driven by hand. Useful for tests and for hosts that own
/// their frame clock.
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<Vec<(Task, FrameJob)>>,
    requests: Cell<usize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every job queued before this call. Jobs scheduled while the
    /// frame runs wait for the next one. Returns how many jobs ran.
    pub fn run_frame(&self) -> usize {
        let jobs = std::mem::take(&mut *self.queue.borrow_mut());
        let now = Instant::now();
        let mut ran = 0;
        for (task, job) in jobs {
            if task.begin() {
                job(now);
                ran += 1;
            }
        }
        ran
    }

    /// Number of queued jobs that have not been canceled.
    pub fn pending_frames(&self) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|(task, _)| !task.is_completed())
            .count()
    }

    /// Total number of `on_next_frame` calls so far.
    pub fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl AnimationScheduler for ManualScheduler {
    fn on_next_frame(&self, job: FrameJob) -> Task {
        let task = Task::new();
        self.requests.set(self.requests.get() + 1);
        self.queue.borrow_mut().push((task.clone(), job));
        task
    }
}
