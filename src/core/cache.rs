//! Cache line isolation untuk cursor read/write
//!
//! Ukuran padding ditentukan saat compile lewat feature `cache-line-32` /
//! `cache-line-128` (default 64 byte, ukuran umum di x86-64 dan kebanyakan ARM).
//! Ukuran hardware sebenarnya bisa dicek saat runtime dengan
//! [`detected_cache_line_size`].

use std::ops::{Deref, DerefMut};

/// Ukuran padding cursor (bytes) yang dipakai build ini
#[cfg(feature = "cache-line-32")]
pub const CACHE_LINE_SIZE: usize = 32;
#[cfg(all(feature = "cache-line-128", not(feature = "cache-line-32")))]
pub const CACHE_LINE_SIZE: usize = 128;
#[cfg(not(any(feature = "cache-line-32", feature = "cache-line-128")))]
pub const CACHE_LINE_SIZE: usize = 64;

/// Padding untuk cache line isolation
///
/// Producer terus menulis write cursor, consumer terus menulis read cursor.
/// Tanpa padding keduanya bisa berbagi satu cache line (false sharing).
#[cfg_attr(feature = "cache-line-32", repr(C, align(32)))]
#[cfg_attr(
    all(feature = "cache-line-128", not(feature = "cache-line-32")),
    repr(C, align(128))
)]
#[cfg_attr(
    not(any(feature = "cache-line-32", feature = "cache-line-128")),
    repr(C, align(64))
)]
#[derive(Debug, Default)]
pub struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Deref for CacheLinePadded<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CacheLinePadded<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Ukuran L1 data cache line dari OS, `None` kalau tidak tersedia
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub fn detected_cache_line_size() -> Option<usize> {
    // SAFETY: sysconf tidak punya precondition, hanya membaca konfigurasi sistem
    let size = unsafe { libc::sysconf(libc::_SC_LEVEL1_DCACHE_LINESIZE) };
    usize::try_from(size).ok().filter(|&s| s > 0)
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
pub fn detected_cache_line_size() -> Option<usize> {
    None
}

/// Bandingkan padding build ini dengan hardware.
///
/// Returns `false` (dan log warning) kalau cache line hardware lebih lebar
/// dari padding, artinya kedua cursor masih bisa false sharing.
pub fn check_cache_line() -> bool {
    match detected_cache_line_size() {
        Some(hw) if hw > CACHE_LINE_SIZE => {
            tracing::warn!(
                hardware = hw,
                padding = CACHE_LINE_SIZE,
                "cache line wider than cursor padding, enable a larger cache-line feature"
            );
            false
        }
        Some(hw) => {
            tracing::debug!(hardware = hw, padding = CACHE_LINE_SIZE, "cache line padding ok");
            true
        }
        None => {
            tracing::debug!(padding = CACHE_LINE_SIZE, "cache line size not detectable");
            true
        }
    }
}
