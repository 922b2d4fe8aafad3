//! Core module: Lock-Free SPSC Ring Buffer di atas storage yang bisa diganti
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic load/store, tidak ada Mutex atau CAS
//! - No-Allocation: Region disediakan storage provider saat bind
//! - Cache-Friendly: Cursor read/write di cache line terpisah

mod cache;
mod ring_buffer;
mod storage;

pub use cache::{check_cache_line, detected_cache_line_size, CacheLinePadded, CACHE_LINE_SIZE};
pub use ring_buffer::{Consumer, Producer, RingBuffer};
pub use storage::{BorrowedStorage, HeapStorage, InlineStorage, MmapStorage, Slot, Storage};
