//! Error types untuk nanoq
//!
//! Overflow/Underflow adalah kesalahan pemanggil (kapasitas salah ukur atau
//! lupa cek `is_full()`/`is_empty()`), bukan mekanisme backpressure.
//! Queue tidak pernah retry secara internal.

use std::fmt;
use std::io;

use thiserror::Error;

/// Kegagalan operasi queue. State queue tidak berubah saat error dikembalikan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Push/emplace saat queue penuh
    #[error("ring buffer overflow: queue is full")]
    Overflow,
    /// `front()`/`pop_front()` saat queue kosong
    #[error("ring buffer underflow: queue is empty")]
    Underflow,
}

/// Overflow dari `push_back` by-move. Value yang ditolak dikembalikan ke caller.
#[derive(Error, PartialEq, Eq)]
#[error("ring buffer overflow: queue is full")]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Ambil kembali value yang gagal di-push
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual supaya T tidak perlu Debug
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PushError").finish_non_exhaustive()
    }
}

impl<T> From<PushError<T>> for QueueError {
    fn from(_: PushError<T>) -> Self {
        QueueError::Overflow
    }
}

/// Kegagalan saat menyiapkan region storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to map storage region: {0}")]
    Io(#[from] io::Error),
    #[error("zero-sized element types cannot be backed by a mapped region")]
    ZeroSizedElement,
    #[error("element alignment {align} exceeds page alignment {page}")]
    OverAligned { align: usize, page: usize },
    #[error("capacity {0} overflows the addressable region size")]
    CapacityOverflow(usize),
}
