//! Run work submitted from many callers one item at a time, in submission order.
//!
//! A [`SerialQueue`] accepts synchronous and asynchronous bodies, with or without a value, from
//! any number of concurrent callers. Bodies run strictly in the order they were admitted, never
//! overlapping, and each caller gets back only its own body's value or failure:
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use serial_queue::SerialQueue;
//!
//! let queue = SerialQueue::new();
//! let a = queue.enqueue_fn(|| 1);
//! let b = queue.enqueue_async_fn(|| async { 2 });
//! assert_eq!(a.await + b.await, 3);
//! # }
//! ```

#[macro_use]
extern crate tracing;

mod queue;
mod util;

pub use crate::queue::api::*;

/// Error types
pub mod error {
    pub use crate::queue::error::*;
}

/// Future types
pub mod future {
    pub use crate::queue::api::future::*;
}
