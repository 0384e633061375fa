use std::{collections::VecDeque, io, sync::Arc, thread::JoinHandle};

use parking_lot::{Condvar, Mutex};

struct JobQueueInternal<J> {
  jobs: VecDeque<J>,
  exit_requested: bool,
}

struct JobQueue<J> {
  internal: Mutex<JobQueueInternal<J>>,
  condition: Condvar,
}

impl<J> JobQueue<J> {
  /// block until a job is available or exit is requested. exit wins over queued jobs.
  fn next_job(&self) -> Option<J> {
    let mut internal = self.internal.lock();
    loop {
      if internal.exit_requested {
        return None;
      }
      if let Some(job) = internal.jobs.pop_front() {
        return Some(job);
      }
      self.condition.wait(&mut internal);
    }
  }
}

/// A dedicated background thread executing jobs one by one, strictly in push order.
///
/// The executor runs outside the queue lock, so pushing never waits for a job in flight.
///
/// Stopping the worker (by [`JobWorker::shutdown`] or drop) waits for the job currently
/// being executed to return, and never executes anything still queued at that point. The
/// not executed jobs are handed back by `shutdown`, or dropped.
pub struct JobWorker<J> {
  queue: Arc<JobQueue<J>>,
  thread: Option<JoinHandle<()>>,
  name: String,
}

impl<J: Send + 'static> JobWorker<J> {
  pub fn new(
    name: impl Into<String>,
    mut executor: impl FnMut(J) + Send + 'static,
  ) -> io::Result<Self> {
    let name = name.into();
    let queue = Arc::new(JobQueue {
      internal: Mutex::new(JobQueueInternal {
        jobs: VecDeque::new(),
        exit_requested: false,
      }),
      condition: Condvar::new(),
    });

    let queue_clone = queue.clone();
    let thread = std::thread::Builder::new()
      .name(name.clone())
      .spawn(move || {
        while let Some(job) = queue_clone.next_job() {
          executor(job);
        }
      })?;

    log::debug!("job worker `{name}` started");

    Ok(Self {
      queue,
      thread: Some(thread),
      name,
    })
  }
}

impl<J> JobWorker<J> {
  /// jobs pushed after an exit request stay queued and will be discarded.
  pub fn push(&self, job: J) {
    let mut internal = self.queue.internal.lock();
    internal.jobs.push_back(job);
    drop(internal);
    self.queue.condition.notify_one();
  }

  /// count of jobs queued but not yet picked up by the worker
  pub fn pending(&self) -> usize {
    self.queue.internal.lock().jobs.len()
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// ask the worker to stop after its current job, without waiting for it.
  pub fn request_exit(&self) {
    let mut internal = self.queue.internal.lock();
    internal.exit_requested = true;
    drop(internal);
    self.queue.condition.notify_all();
  }

  /// stop and join the worker, returning the jobs that were never executed, in push order.
  pub fn shutdown(mut self) -> Vec<J> {
    self.stop()
  }

  fn stop(&mut self) -> Vec<J> {
    self.request_exit();
    if let Some(thread) = self.thread.take() {
      if thread.join().is_err() {
        log::error!("job worker `{}` panicked", self.name);
      }
    }

    let discarded: Vec<J> = self.queue.internal.lock().jobs.drain(..).collect();
    log::debug!(
      "job worker `{}` stopped, {} queued job(s) discarded",
      self.name,
      discarded.len()
    );
    discarded
  }
}

impl<J> Drop for JobWorker<J> {
  fn drop(&mut self) {
    if self.thread.is_some() {
      self.stop();
    }
  }
}
