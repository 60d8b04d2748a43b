//! Playback pipeline components.
//!
//! A fixed pool of period buffers cycles between two threads:
//!
//! ```text
//! free list → Generator (fill) → filled FIFO → Drain (write) → free list
//! ```
//!
//! - **Pool**: free list and filled FIFO behind one lock, plus two counting
//!   semaphores so each side blocks instead of polling
//! - **Generator**: hands zeroed slots to the fill callback
//! - **Drain**: writes slots to the device in fill order and recovers from
//!   write errors
//!
//! The pool size bounds how far generation can run ahead of the device.

mod drain;
mod generator;
mod pool;
mod semaphore;

pub(crate) use drain::Drain;
pub use generator::FillBuffer;
pub(crate) use generator::run_generator;
pub(crate) use pool::BufferPool;
