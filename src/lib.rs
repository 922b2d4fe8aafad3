//! nanoq - Fixed-Capacity Lock-Free SPSC Queue
//!
//! Satu producer thread dan satu consumer thread bertukar elemen lewat ring
//! buffer contiguous tanpa lock. Region slot disediakan storage provider:
//! inline (kapasitas saat compile), heap (kapasitas saat runtime), region
//! milik caller, atau anonymous mmap.
//!
//! ```
//! use nanoq::core::{HeapStorage, RingBuffer};
//!
//! let mut queue: RingBuffer<u64, HeapStorage<u64>> = RingBuffer::with_capacity(8);
//! let (mut tx, mut rx) = queue.split();
//!
//! std::thread::scope(|s| {
//!     s.spawn(move || {
//!         for i in 0..100 {
//!             while tx.push_back(i).is_err() {
//!                 std::hint::spin_loop();
//!             }
//!         }
//!     });
//!
//!     let mut expected = 0;
//!     while expected < 100 {
//!         if let Ok(v) = rx.take_front() {
//!             assert_eq!(v, expected);
//!             expected += 1;
//!         }
//!     }
//! });
//! ```

pub mod core;
pub mod error;

pub use crate::core::{Consumer, Producer, RingBuffer};
pub use crate::error::{PushError, QueueError, StorageError};
