use crate::*;

#[derive(thiserror::Error, Debug)]
pub enum TimerQueryError {
  #[error("{requested:?} timer query is requested but the device does not provide the capability")]
  CapabilityMismatch { requested: TimerQueryKind },
  #[error(
    "Failed to allocate native timer query object, but the extension is reported as supported"
  )]
  QueryAllocation,
  #[error("Failed to spawn the fence timer query worker thread")]
  WorkerSpawn(#[from] std::io::Error),
}
