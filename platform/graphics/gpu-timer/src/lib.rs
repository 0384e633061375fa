//! gpu elapsed time measurement behind one interface. depends on what the driver offers, the
//! timing is implemented by native timer query objects, by host observed fence completion on
//! a dedicated worker thread, or by a fallback that always reports zero.

mod error;
mod fallback;
mod fence;
mod interface;
mod native;
mod query;
mod select;


use std::{
  sync::{Arc, Weak},
  time::Instant,
};

pub use error::*;
pub use fallback::*;
pub use fence::*;
pub use interface::*;
use job_worker::JobWorker;
pub use native::*;
use parking_lot::Mutex;
pub use query::*;
pub use select::*;
