use crate::*;

pub struct TimerQueryConfig {
  /// use exactly this implementation, failing if the capability is missing
  pub forced_kind: Option<TimerQueryKind>,
  /// some drivers expose native timer queries that are much less accurate than fences. when set
  /// the native path is only used if forced.
  pub native_unreliable: bool,
  pub worker_thread_name: String,
}

impl Default for TimerQueryConfig {
  fn default() -> Self {
    Self {
      forced_kind: None,
      native_unreliable: false,
      worker_thread_name: "gpu-timer-fence".into(),
    }
  }
}

/// what the capability detection found, filled by the renderer
#[derive(Default)]
pub struct TimerQueryCapabilities {
  pub native: Option<Box<dyn NativeTimerDevice>>,
  pub fence: Option<Arc<dyn FenceDevice>>,
  /// stamps fence completions, a monotonic clock is used if the platform has none to offer
  pub host_clock: Option<Arc<dyn HostClock>>,
}

impl TimerQueryCapabilities {
  pub fn preferred_kind(&self, native_unreliable: bool) -> TimerQueryKind {
    if self.native.is_some() && !native_unreliable {
      TimerQueryKind::Native
    } else if self.fence.is_some() {
      TimerQueryKind::Fence
    } else {
      TimerQueryKind::Fallback
    }
  }
}

/// The timer query implementation chosen for a device context, for its whole lifetime.
pub enum GPUTimerQuery {
  Native(NativeTimerQuery),
  Fence(FenceTimerQuery),
  Fallback(FallbackTimerQuery),
}

impl GPUTimerQuery {
  pub fn select(
    capabilities: TimerQueryCapabilities,
    config: &TimerQueryConfig,
  ) -> Result<Self, TimerQueryError> {
    let kind = config
      .forced_kind
      .unwrap_or_else(|| capabilities.preferred_kind(config.native_unreliable));
    let mismatch = TimerQueryError::CapabilityMismatch { requested: kind };

    let timer = match kind {
      TimerQueryKind::Native => Self::Native(NativeTimerQuery::new(
        capabilities.native.ok_or(mismatch)?,
      )),
      TimerQueryKind::Fence => {
        let device = capabilities.fence.ok_or(mismatch)?;
        let clock = capabilities
          .host_clock
          .unwrap_or_else(|| Arc::new(MonotonicClock::default()));
        Self::Fence(FenceTimerQuery::new_with_clock(
          device,
          clock,
          &config.worker_thread_name,
        )?)
      }
      TimerQueryKind::Fallback => Self::Fallback(FallbackTimerQuery),
    };

    if config.forced_kind.is_some() {
      log::info!("gpu timer query uses forced {kind:?} implementation");
    } else {
      log::info!("gpu timer query uses {kind:?} implementation");
    }
    Ok(timer)
  }

  fn as_strategy(&self) -> &dyn TimerQueryStrategy {
    match self {
      Self::Native(t) => t,
      Self::Fence(t) => t,
      Self::Fallback(t) => t,
    }
  }
}

impl TimerQueryStrategy for GPUTimerQuery {
  fn kind(&self) -> TimerQueryKind {
    self.as_strategy().kind()
  }

  fn create_query(&self) -> Result<TimerQuery, TimerQueryError> {
    self.as_strategy().create_query()
  }

  fn destroy_query(&self, query: TimerQuery) {
    self.as_strategy().destroy_query(query)
  }

  fn begin_time_elapsed_query(&self, query: &TimerQuery) {
    self.as_strategy().begin_time_elapsed_query(query)
  }

  fn end_time_elapsed_query(&self, query: &TimerQuery) {
    self.as_strategy().end_time_elapsed_query(query)
  }

  fn query_result_available(&self, query: &TimerQuery) -> bool {
    self.as_strategy().query_result_available(query)
  }

  fn query_result(&self, query: &TimerQuery) -> u64 {
    self.as_strategy().query_result(query)
  }
}
