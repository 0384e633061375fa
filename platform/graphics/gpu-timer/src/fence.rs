use crate::*;

/// Driver side fence token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawFence(pub u64);

/// Driver access for sync fences.
///
/// `create_fence` is called on the render thread right after the work to be bounded is
/// submitted. `wait_fence` is called on the timer worker thread. `destroy_fence` is called on
/// the worker for every executed job, and on the thread dropping the [`FenceTimerQuery`] for
/// jobs discarded by the teardown.
pub trait FenceDevice: Send + Sync {
  fn create_fence(&self) -> RawFence;
  /// block until the fence is signaled, without timeout. a fence that never signals means the
  /// device is lost, which is not handled here.
  fn wait_fence(&self, fence: RawFence);
  fn destroy_fence(&self, fence: RawFence);
}

/// the host time source fence completions are stamped with
pub trait HostClock: Send + Sync {
  fn now_ns(&self) -> u64;
}

pub struct MonotonicClock {
  origin: Instant,
}

impl Default for MonotonicClock {
  fn default() -> Self {
    Self {
      origin: Instant::now(),
    }
  }
}

impl HostClock for MonotonicClock {
  fn now_ns(&self) -> u64 {
    self.origin.elapsed().as_nanos() as u64
  }
}

/// `generation` is the handle generation at enqueue time. a job of an abandoned cycle still
/// waits and releases its fence but leaves the handle untouched.
pub(crate) enum FenceJob {
  Begin {
    fence: RawFence,
    query: Weak<Mutex<TimerQueryState>>,
    generation: u64,
  },
  End {
    fence: RawFence,
    query: Weak<Mutex<TimerQueryState>>,
    generation: u64,
  },
}

impl FenceJob {
  fn fence(&self) -> RawFence {
    match self {
      FenceJob::Begin { fence, .. } | FenceJob::End { fence, .. } => *fence,
    }
  }
}

struct FenceJobExecutor {
  device: Arc<dyn FenceDevice>,
  clock: Arc<dyn HostClock>,
}

impl FenceJobExecutor {
  fn execute(&self, job: FenceJob) {
    match job {
      FenceJob::Begin {
        fence,
        query,
        generation,
      } => {
        // the handle may be destroyed while the job is queued, then we only release the fence
        if let Some(query) = query.upgrade() {
          self.device.wait_fence(fence);
          let now = self.clock.now_ns();
          let mut state = query.lock();
          if state.generation == generation {
            state.start_ns = now;
          }
        }
        self.device.destroy_fence(fence);
      }
      FenceJob::End {
        fence,
        query,
        generation,
      } => {
        if let Some(query) = query.upgrade() {
          self.device.wait_fence(fence);
          let now = self.clock.now_ns();
          let mut state = query.lock();
          if state.generation == generation {
            let elapsed = now.saturating_sub(state.start_ns);
            state.resolve(elapsed);
          }
        }
        self.device.destroy_fence(fence);
      }
    }
  }
}

/// Elapsed time measured as the host observed time between two fences being signaled.
///
/// Fence waits are unbounded, so they happen on a dedicated worker thread. Begin and end are
/// forwarded as jobs executed strictly in call order, which keeps every begin ahead of its end.
///
/// Dropping waits for the job currently executing (including its fence wait) and discards the
/// queued rest; the fences of discarded jobs are destroyed without being waited on.
pub struct FenceTimerQuery {
  device: Arc<dyn FenceDevice>,
  worker: Option<JobWorker<FenceJob>>,
}

impl FenceTimerQuery {
  pub fn new(device: Arc<dyn FenceDevice>, worker_name: &str) -> Result<Self, TimerQueryError> {
    Self::new_with_clock(device, Arc::new(MonotonicClock::default()), worker_name)
  }

  pub fn new_with_clock(
    device: Arc<dyn FenceDevice>,
    clock: Arc<dyn HostClock>,
    worker_name: &str,
  ) -> Result<Self, TimerQueryError> {
    let executor = FenceJobExecutor {
      device: device.clone(),
      clock,
    };
    let worker = JobWorker::new(worker_name, move |job| executor.execute(job))?;

    Ok(Self {
      device,
      worker: Some(worker),
    })
  }

  /// jobs not yet picked up by the worker
  pub fn pending_jobs(&self) -> usize {
    self.worker.as_ref().map(|w| w.pending()).unwrap_or(0)
  }

  fn push(&self, job: FenceJob) {
    if let Some(worker) = &self.worker {
      worker.push(job);
    }
  }
}

impl TimerQueryStrategy for FenceTimerQuery {
  fn kind(&self) -> TimerQueryKind {
    TimerQueryKind::Fence
  }

  fn create_query(&self) -> Result<TimerQuery, TimerQueryError> {
    Ok(TimerQuery::new(RawQueryId::default()))
  }

  fn destroy_query(&self, query: TimerQuery) {
    // queued jobs only hold weak references and skip their wait once this is gone
    drop(query);
  }

  fn begin_time_elapsed_query(&self, query: &TimerQuery) {
    let generation = {
      let mut state = query.state.lock();
      state.mark_began();
      state.generation
    };
    let fence = self.device.create_fence();
    self.push(FenceJob::Begin {
      fence,
      query: query.downgrade_state(),
      generation,
    });
  }

  fn end_time_elapsed_query(&self, query: &TimerQuery) {
    let generation = {
      let mut state = query.state.lock();
      state.mark_ended();
      state.generation
    };
    let fence = self.device.create_fence();
    self.push(FenceJob::End {
      fence,
      query: query.downgrade_state(),
      generation,
    });
  }

  fn query_result_available(&self, query: &TimerQuery) -> bool {
    query.state.lock().phase == TimerQueryPhase::ResultAvailable
  }

  fn query_result(&self, query: &TimerQuery) -> u64 {
    let state = query.state.lock();
    debug_assert_eq!(
      state.phase,
      TimerQueryPhase::ResultAvailable,
      "timer query result read before it is available"
    );
    state.elapsed_ns
  }
}

impl Drop for FenceTimerQuery {
  fn drop(&mut self) {
    if let Some(worker) = self.worker.take() {
      let discarded = worker.shutdown();
      if !discarded.is_empty() {
        log::warn!(
          "fence timer query dropped with {} pending job(s), their measurements are lost",
          discarded.len()
        );
      }
      // the worker is gone, discarded fences are released on this thread
      for job in discarded {
        self.device.destroy_fence(job.fence());
      }
    }
  }
}
