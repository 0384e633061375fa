use crate::*;

/// Driver access for hardware elapsed time query objects.
///
/// Every call must be issued on the thread owning the rendering context, so the device is not
/// required to be `Send`.
pub trait NativeTimerDevice {
  /// None if the driver failed to allocate a query object
  fn create_query(&self) -> Option<RawQueryId>;
  fn destroy_query(&self, query: RawQueryId);
  fn begin_time_elapsed(&self, query: RawQueryId);
  fn end_time_elapsed(&self, query: RawQueryId);
  /// must not block
  fn is_result_available(&self, query: RawQueryId) -> bool;
  /// raw counter delta between begin and end, in device ticks
  fn result_ticks(&self, query: RawQueryId) -> u64;
  /// nanoseconds per device tick as reported by the driver
  fn timestamp_period_ns(&self) -> f32;
}

pub fn ticks_to_nanoseconds(ticks: u64, time_unit_in_nanoseconds: f32) -> u64 {
  // most desktop drivers report in nanoseconds already, skip the float path to keep u64 range
  if time_unit_in_nanoseconds == 1.0 {
    return ticks;
  }
  (ticks as f64 * time_unit_in_nanoseconds as f64).round() as u64
}

pub struct NativeTimerQuery {
  device: Box<dyn NativeTimerDevice>,
}

impl NativeTimerQuery {
  pub fn new(device: Box<dyn NativeTimerDevice>) -> Self {
    Self { device }
  }

  fn read_elapsed(&self, query: &TimerQuery) -> u64 {
    let ticks = self.device.result_ticks(query.raw());
    ticks_to_nanoseconds(ticks, self.device.timestamp_period_ns())
  }
}

impl TimerQueryStrategy for NativeTimerQuery {
  fn kind(&self) -> TimerQueryKind {
    TimerQueryKind::Native
  }

  fn create_query(&self) -> Result<TimerQuery, TimerQueryError> {
    match self.device.create_query() {
      Some(raw) => Ok(TimerQuery::new(raw)),
      None => {
        log::error!("native timer query object allocation failed");
        Err(TimerQueryError::QueryAllocation)
      }
    }
  }

  fn destroy_query(&self, query: TimerQuery) {
    self.device.destroy_query(query.raw());
  }

  fn begin_time_elapsed_query(&self, query: &TimerQuery) {
    query.state.lock().mark_began();
    self.device.begin_time_elapsed(query.raw());
  }

  fn end_time_elapsed_query(&self, query: &TimerQuery) {
    query.state.lock().mark_ended();
    self.device.end_time_elapsed(query.raw());
  }

  fn query_result_available(&self, query: &TimerQuery) -> bool {
    let mut state = query.state.lock();
    match state.phase {
      TimerQueryPhase::ResultAvailable => true,
      TimerQueryPhase::Ended => {
        if !self.device.is_result_available(query.raw()) {
          return false;
        }
        // cache it so the driver is only read once per cycle
        state.resolve(self.read_elapsed(query));
        true
      }
      TimerQueryPhase::Idle | TimerQueryPhase::Began => false,
    }
  }

  fn query_result(&self, query: &TimerQuery) -> u64 {
    let state = query.state.lock();
    debug_assert_eq!(
      state.phase,
      TimerQueryPhase::ResultAvailable,
      "timer query result read before it is available"
    );
    if state.phase == TimerQueryPhase::ResultAvailable {
      return state.elapsed_ns;
    }
    // release build contract violation, the driver read blocks until the result lands
    drop(state);
    self.read_elapsed(query)
  }
}

#[cfg(test)]
mod test {
  use std::{
    cell::{Cell, RefCell},
    rc::Rc,
  };

  use super::*;

  #[derive(Default)]
  struct MockNativeDevice {
    next_id: Cell<u32>,
    fail_allocation: bool,
    live: RefCell<Vec<RawQueryId>>,
    active: Cell<Option<RawQueryId>>,
    available: Cell<bool>,
    ticks: Cell<u64>,
    reads: Cell<usize>,
    period: f32,
  }

  impl NativeTimerDevice for Rc<MockNativeDevice> {
    fn create_query(&self) -> Option<RawQueryId> {
      if self.fail_allocation {
        return None;
      }
      self.next_id.set(self.next_id.get() + 1);
      let id = RawQueryId(self.next_id.get());
      self.live.borrow_mut().push(id);
      Some(id)
    }
    fn destroy_query(&self, query: RawQueryId) {
      self.live.borrow_mut().retain(|q| *q != query);
    }
    fn begin_time_elapsed(&self, query: RawQueryId) {
      assert!(self.active.get().is_none(), "nested time elapsed query");
      self.active.set(Some(query));
    }
    fn end_time_elapsed(&self, query: RawQueryId) {
      assert_eq!(self.active.take(), Some(query));
    }
    fn is_result_available(&self, _: RawQueryId) -> bool {
      self.available.get()
    }
    fn result_ticks(&self, _: RawQueryId) -> u64 {
      self.reads.set(self.reads.get() + 1);
      self.ticks.get()
    }
    fn timestamp_period_ns(&self) -> f32 {
      self.period
    }
  }

  fn mock(period: f32) -> (Rc<MockNativeDevice>, NativeTimerQuery) {
    let device = Rc::new(MockNativeDevice {
      period,
      ..Default::default()
    });
    let strategy = NativeTimerQuery::new(Box::new(device.clone()));
    (device, strategy)
  }

  #[test]
  fn tick_conversion() {
    assert_eq!(ticks_to_nanoseconds(1000, 1.0), 1000);
    assert_eq!(ticks_to_nanoseconds(1000, 2.5), 2500);
    assert_eq!(ticks_to_nanoseconds(3, 83.333), 250);
    assert_eq!(ticks_to_nanoseconds(u64::MAX, 1.0), u64::MAX);
    assert_eq!(ticks_to_nanoseconds(0, 52.08), 0);
  }

  #[test]
  fn available_only_after_end_and_driver_completion() {
    let (device, strategy) = mock(1.0);
    assert_eq!(strategy.kind(), TimerQueryKind::Native);
    let query = strategy.create_query().unwrap();

    assert!(!strategy.query_result_available(&query));
    strategy.begin_time_elapsed_query(&query);
    device.available.set(true);
    assert!(!strategy.query_result_available(&query));

    strategy.end_time_elapsed_query(&query);
    device.available.set(false);
    assert!(!strategy.query_result_available(&query));

    device.ticks.set(1000);
    device.available.set(true);
    assert!(strategy.query_result_available(&query));
    assert_eq!(strategy.query_result(&query), 1000);

    // further polls and reads use the cached value
    assert!(strategy.query_result_available(&query));
    assert_eq!(strategy.query_result(&query), 1000);
    assert_eq!(device.reads.get(), 1);
  }

  #[test]
  fn result_is_converted_by_timestamp_period() {
    let (device, strategy) = mock(4.0);
    let query = strategy.create_query().unwrap();
    strategy.begin_time_elapsed_query(&query);
    strategy.end_time_elapsed_query(&query);
    device.ticks.set(250);
    device.available.set(true);
    assert!(strategy.query_result_available(&query));
    assert_eq!(strategy.query_result(&query), 1000);
  }

  #[test]
  fn handle_is_reusable_after_result() {
    let (device, strategy) = mock(1.0);
    let query = strategy.create_query().unwrap();
    device.available.set(true);

    for ticks in [10, 20, 30] {
      strategy.begin_time_elapsed_query(&query);
      strategy.end_time_elapsed_query(&query);
      device.ticks.set(ticks);
      assert!(strategy.query_result_available(&query));
      assert_eq!(strategy.query_result(&query), ticks);
    }
  }

  #[test]
  fn allocation_failure_is_a_hard_error() {
    let device = Rc::new(MockNativeDevice {
      fail_allocation: true,
      period: 1.0,
      ..Default::default()
    });
    let strategy = NativeTimerQuery::new(Box::new(device));
    assert!(matches!(
      strategy.create_query(),
      Err(TimerQueryError::QueryAllocation)
    ));
  }

  #[test]
  fn destroy_releases_query_object() {
    let (device, strategy) = mock(1.0);
    let a = strategy.create_query().unwrap();
    let b = strategy.create_query().unwrap();
    assert_ne!(a.raw(), b.raw());
    strategy.destroy_query(a);
    assert_eq!(device.live.borrow().as_slice(), &[b.raw()]);
  }
}
