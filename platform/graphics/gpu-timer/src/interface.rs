use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerQueryKind {
  /// hardware elapsed time query objects
  Native,
  /// host observed fence completion, waited on a worker thread
  Fence,
  /// no timing capability, always reports zero
  Fallback,
}

/// The elapsed time measurement contract shared by all timer query implementations.
///
/// Call order per handle and per cycle is `begin_time_elapsed_query`,
/// `end_time_elapsed_query`, then any number of `query_result_available` polls, and
/// `query_result` once available. Violating the order is a caller bug, detected by debug
/// assertions. All calls happen on the thread owning the rendering context.
pub trait TimerQueryStrategy {
  fn kind(&self) -> TimerQueryKind;

  /// allocate a handle with whatever backing this implementation needs.
  fn create_query(&self) -> Result<TimerQuery, TimerQueryError>;
  /// release the backing of the handle. pending work referencing it is skipped.
  fn destroy_query(&self, query: TimerQuery);

  fn begin_time_elapsed_query(&self, query: &TimerQuery);
  fn end_time_elapsed_query(&self, query: &TimerQuery);

  /// non blocking, cheap enough to be polled every frame
  fn query_result_available(&self, query: &TimerQuery) -> bool;

  /// elapsed time in nanoseconds
  fn query_result(&self, query: &TimerQuery) -> u64;
}
