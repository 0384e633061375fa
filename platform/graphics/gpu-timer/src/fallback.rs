use crate::*;

/// Used when neither native timer queries nor fences are usable. Results are always
/// immediately available and always zero.
#[derive(Default)]
pub struct FallbackTimerQuery;

impl TimerQueryStrategy for FallbackTimerQuery {
  fn kind(&self) -> TimerQueryKind {
    TimerQueryKind::Fallback
  }

  fn create_query(&self) -> Result<TimerQuery, TimerQueryError> {
    Ok(TimerQuery::new(RawQueryId::default()))
  }

  fn destroy_query(&self, _: TimerQuery) {}

  fn begin_time_elapsed_query(&self, _: &TimerQuery) {}

  fn end_time_elapsed_query(&self, _: &TimerQuery) {}

  fn query_result_available(&self, _: &TimerQuery) -> bool {
    true
  }

  fn query_result(&self, _: &TimerQuery) -> u64 {
    0
  }
}

#[test]
fn fallback_is_always_available_and_zero() {
  let strategy = FallbackTimerQuery;
  let query = strategy.create_query().unwrap();

  // degenerate usage is fine as well
  assert!(strategy.query_result_available(&query));
  assert_eq!(strategy.query_result(&query), 0);
  strategy.end_time_elapsed_query(&query);
  strategy.end_time_elapsed_query(&query);
  assert_eq!(strategy.query_result(&query), 0);

  for _ in 0..3 {
    strategy.begin_time_elapsed_query(&query);
    assert!(strategy.query_result_available(&query));
    strategy.end_time_elapsed_query(&query);
    assert!(strategy.query_result_available(&query));
    assert_eq!(strategy.query_result(&query), 0);
  }

  assert_eq!(query.phase(), TimerQueryPhase::Idle);
  strategy.destroy_query(query);
}
