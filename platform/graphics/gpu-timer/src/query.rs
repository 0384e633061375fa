use crate::*;

/// driver side query object name. only meaningful for the native implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RawQueryId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerQueryPhase {
  Idle,
  Began,
  Ended,
  ResultAvailable,
}

pub(crate) struct TimerQueryState {
  pub phase: TimerQueryPhase,
  /// host time the begin fence is observed as signaled, fence implementation only
  pub start_ns: u64,
  pub elapsed_ns: u64,
  /// bumped on every begin and reset, work queued for an older cycle must not touch the state
  pub generation: u64,
}

impl TimerQueryState {
  pub fn mark_began(&mut self) {
    debug_assert!(
      matches!(
        self.phase,
        TimerQueryPhase::Idle | TimerQueryPhase::ResultAvailable
      ),
      "timer query began while the previous measurement is still in flight ({:?})",
      self.phase
    );
    self.phase = TimerQueryPhase::Began;
    self.start_ns = 0;
    self.elapsed_ns = 0;
    self.generation = self.generation.wrapping_add(1);
  }

  pub fn mark_ended(&mut self) {
    debug_assert_eq!(
      self.phase,
      TimerQueryPhase::Began,
      "timer query ended without a matching begin"
    );
    self.phase = TimerQueryPhase::Ended;
  }

  pub fn resolve(&mut self, elapsed_ns: u64) {
    self.elapsed_ns = elapsed_ns;
    self.phase = TimerQueryPhase::ResultAvailable;
  }
}

/// Per measurement record, owned by the renderer and lent to the active strategy for each call.
///
/// A handle measures one span at a time: after `begin` it must reach
/// [`TimerQueryPhase::ResultAvailable`] (or be [`reset`](TimerQuery::reset)) before the next
/// `begin`. The state sits behind a lock shared with the fence worker, so an available phase
/// always comes with a fully written result.
pub struct TimerQuery {
  raw: RawQueryId,
  pub(crate) state: Arc<Mutex<TimerQueryState>>,
}

impl TimerQuery {
  pub(crate) fn new(raw: RawQueryId) -> Self {
    Self {
      raw,
      state: Arc::new(Mutex::new(TimerQueryState {
        phase: TimerQueryPhase::Idle,
        start_ns: 0,
        elapsed_ns: 0,
        generation: 0,
      })),
    }
  }

  pub fn raw(&self) -> RawQueryId {
    self.raw
  }

  pub fn phase(&self) -> TimerQueryPhase {
    self.state.lock().phase
  }

  /// force the handle back to idle, abandoning the measurement in flight. work still queued
  /// for the abandoned cycle completes without writing into the handle.
  pub fn reset(&self) {
    let mut state = self.state.lock();
    state.phase = TimerQueryPhase::Idle;
    state.start_ns = 0;
    state.elapsed_ns = 0;
    state.generation = state.generation.wrapping_add(1);
  }

  pub(crate) fn downgrade_state(&self) -> Weak<Mutex<TimerQueryState>> {
    Arc::downgrade(&self.state)
  }
}

impl std::fmt::Debug for TimerQuery {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TimerQuery")
      .field("raw", &self.raw)
      .field("phase", &self.phase())
      .finish()
  }
}

#[test]
fn query_lifecycle() {
  let query = TimerQuery::new(RawQueryId(3));
  assert_eq!(query.raw(), RawQueryId(3));
  assert_eq!(query.phase(), TimerQueryPhase::Idle);

  query.state.lock().mark_began();
  assert_eq!(query.phase(), TimerQueryPhase::Began);
  assert_eq!(query.state.lock().generation, 1);
  query.state.lock().mark_ended();
  query.state.lock().resolve(42);
  assert_eq!(query.phase(), TimerQueryPhase::ResultAvailable);
  assert_eq!(query.state.lock().elapsed_ns, 42);

  // reuse after availability
  query.state.lock().mark_began();
  assert_eq!(query.state.lock().elapsed_ns, 0);
  assert_eq!(query.state.lock().generation, 2);

  query.reset();
  assert_eq!(query.phase(), TimerQueryPhase::Idle);
  assert_eq!(query.state.lock().generation, 3);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "without a matching begin")]
fn end_without_begin_is_detected_in_debug() {
  let query = TimerQuery::new(RawQueryId::default());
  query.state.lock().mark_ended();
}
