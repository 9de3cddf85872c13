//! Frame scheduling on a calloop event loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use calloop::ping::{make_ping, Ping};
use calloop::{LoopHandle, RegistrationToken};

use crate::error::SchedulerError;
use crate::scheduler::{AnimationScheduler, FrameJob, Task};

type FrameQueue = Rc<RefCell<Vec<(Task, FrameJob)>>>;

/// Runs frame jobs on the next dispatch of a calloop event loop.
///
/// Scheduling a job into an empty queue pings the loop once; further jobs
/// requested before the loop wakes up share that wakeup.
pub struct EventLoopScheduler {
    queue: FrameQueue,
    ping: Ping,
    token: RegistrationToken,
}

impl EventLoopScheduler {
    pub fn new<D: 'static>(handle: &LoopHandle<'_, D>) -> Result<Self, SchedulerError> {
        let (ping, source) = make_ping()?;
        let queue: FrameQueue = Rc::default();

        let jobs = Rc::clone(&queue);
        let token = handle
            .insert_source(source, move |_, _, _| {
                let frame = std::mem::take(&mut *jobs.borrow_mut());
                let now = Instant::now();
                for (task, job) in frame {
                    if task.begin() {
                        job(now);
                    }
                }
            })
            .map_err(|err| SchedulerError::EventLoop(err.error))?;

        Ok(Self { queue, ping, token })
    }

    /// Token of the wakeup source, for removing it from the loop.
    pub fn token(&self) -> RegistrationToken {
        self.token
    }

    pub fn pending_frames(&self) -> usize {
        self.queue
            .borrow()
            .iter()
            .filter(|(task, _)| !task.is_completed())
            .count()
    }
}

impl AnimationScheduler for EventLoopScheduler {
    fn on_next_frame(&self, job: FrameJob) -> Task {
        let task = Task::new();
        let was_idle = {
            let mut queue = self.queue.borrow_mut();
            let was_idle = queue.is_empty();
            queue.push((task.clone(), job));
            was_idle
        };
        if was_idle {
            self.ping.ping();
        }
        task
    }
}
