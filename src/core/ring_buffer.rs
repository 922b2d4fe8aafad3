//! Lock-Free Single-Producer Single-Consumer (SPSC) Ring Buffer
//!
//! Implementasi Lamport Queue di atas region milik storage provider.
//! Tidak ada Mutex, tidak ada alokasi di hot path, tidak ada CAS.
//!
//! Satu slot selalu dikorbankan: queue berisi paling banyak `capacity - 1`
//! elemen, sehingga `read == write` selalu berarti kosong tanpa perlu counter
//! bersama. Setiap cursor hanya ditulis oleh satu thread dan dibaca thread lain.
//!
//! ```text
//! _____xxxxx_____      xxxxx_____xxxxx
//!      ^    ^               ^    ^
//!    read  write          write read
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::cache::CacheLinePadded;
use super::storage::{BorrowedStorage, HeapStorage, InlineStorage, MmapStorage, Storage};
use crate::error::{PushError, QueueError, StorageError};

/// Lock-Free SPSC Ring Buffer
///
/// Cursor read dan write masing-masing di cache line sendiri untuk
/// menghindari false sharing antara producer dan consumer.
///
/// Pemakaian single-thread lewat `&mut self`. Untuk dua thread, pakai
/// [`RingBuffer::split`] yang menghasilkan tepat satu [`Producer`] dan satu
/// [`Consumer`].
///
/// Queue tidak `Clone`: identitasnya terikat ke region dan kedua cursor.
#[repr(C)]
pub struct RingBuffer<T, S: Storage<T>> {
    // Consumer side - cache line aligned
    read: CacheLinePadded<AtomicUsize>,
    // Producer side - cache line aligned
    write: CacheLinePadded<AtomicUsize>,
    storage: S,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T, const N: usize> RingBuffer<T, InlineStorage<T, N>> {
    /// Queue dengan region inline berkapasitas `N`, tanpa alokasi heap
    pub fn inline() -> Self {
        Self::new(InlineStorage::new())
    }
}

impl<T> RingBuffer<T, HeapStorage<T>> {
    /// Queue dengan region heap berkapasitas `capacity`.
    ///
    /// Alokasi hanya terjadi sekali di sini.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(HeapStorage::new(capacity))
    }
}

impl<'a, T> RingBuffer<T, BorrowedStorage<'a, T>> {
    /// Queue sebagai view ke region milik caller
    pub fn from_region(region: &'a mut [MaybeUninit<T>]) -> Self {
        Self::new(BorrowedStorage::new(region))
    }
}

impl<T> RingBuffer<T, MmapStorage<T>> {
    /// Queue di atas region anonymous mmap
    pub fn mmap_anonymous(capacity: usize) -> Result<Self, StorageError> {
        MmapStorage::anonymous(capacity).map(Self::new)
    }
}

impl<T, S: Storage<T> + Default> Default for RingBuffer<T, S> {
    /// Queue di atas `S::default()`. Untuk [`HeapStorage`] dan [`BorrowedStorage`]
    /// hasilnya unbound (kapasitas 0): semua push gagal sampai [`RingBuffer::init`].
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<T, S: Storage<T>> RingBuffer<T, S> {
    /// Bind queue ke `storage`. Kapasitas = jumlah slot storage.
    pub fn new(storage: S) -> Self {
        let capacity = storage.slots().len();
        if capacity > 0 {
            tracing::debug!(capacity, "ring buffer bound");
        }

        Self {
            read: CacheLinePadded::new(AtomicUsize::new(0)),
            write: CacheLinePadded::new(AtomicUsize::new(0)),
            storage,
            capacity,
            _marker: PhantomData,
        }
    }

    /// Bind ulang ke `storage`. Elemen live di region lama di-drop dulu,
    /// lalu region lama dilepas dan cursor di-reset.
    pub fn init(&mut self, storage: S) {
        self.clear();

        let capacity = storage.slots().len();
        tracing::debug!(old = self.capacity, new = capacity, "ring buffer rebound");

        self.storage = storage;
        self.capacity = capacity;
        *self.read.get_mut() = 0;
        *self.write.get_mut() = 0;
    }

    /// Kapasitas total slot (queue menampung paling banyak `capacity - 1`)
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jumlah elemen dalam buffer
    ///
    /// Saat dipanggil bersamaan dengan push/pop, hasilnya hanya snapshot.
    #[inline]
    pub fn available(&self) -> usize {
        let c = self.capacity;
        if c == 0 {
            return 0;
        }

        let rp = self.read.load(Ordering::Acquire);
        let wp = self.write.load(Ordering::Acquire);
        let n = if wp >= rp { wp - rp } else { c + wp - rp };

        debug_assert!(n < c, "available {n} >= capacity {c}");
        n
    }

    /// Jumlah elemen yang masih bisa di-push sebelum penuh
    #[inline]
    pub fn space(&self) -> usize {
        let c = self.capacity;
        if c == 0 {
            return 0;
        }

        let rp = self.read.load(Ordering::Acquire);
        let wp = self.write.load(Ordering::Acquire);
        let n = if wp >= rp { c + rp - wp - 1 } else { rp - wp - 1 };

        debug_assert!(n < c, "space {n} >= capacity {c}");
        n
    }

    /// Cek apakah buffer kosong
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    /// Cek apakah buffer penuh
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.space() == 0
    }

    /// Push data ke buffer.
    ///
    /// Kalau penuh, value dikembalikan lewat [`PushError`] dan state tidak berubah.
    #[inline]
    pub fn push_back(&mut self, value: T) -> Result<(), PushError<T>> {
        // SAFETY: &mut self, tidak ada producer lain
        unsafe { self.produce(value) }
    }

    /// Push salinan `value`. Clone hanya dibuat kalau ada ruang.
    #[inline]
    pub fn push_back_cloned(&mut self, value: &T) -> Result<(), QueueError>
    where
        T: Clone,
    {
        // SAFETY: &mut self, tidak ada producer lain
        unsafe { self.produce_with(|| value.clone()) }
    }

    /// Konstruksi elemen langsung di slot. `make` hanya dipanggil kalau ada ruang.
    #[inline]
    pub fn emplace_back<F>(&mut self, make: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> T,
    {
        // SAFETY: &mut self, tidak ada producer lain
        unsafe { self.produce_with(make) }
    }

    /// Referensi ke elemen terdepan tanpa mengeluarkannya
    #[inline]
    pub fn front(&self) -> Result<&T, QueueError> {
        // SAFETY: &self mencegah pop sampai referensi dilepas
        unsafe { self.peek() }
    }

    /// Drop elemen terdepan
    #[inline]
    pub fn pop_front(&mut self) -> Result<(), QueueError> {
        // SAFETY: &mut self, tidak ada consumer lain
        unsafe { self.consume_drop() }
    }

    /// Keluarkan elemen terdepan (move)
    #[inline]
    pub fn take_front(&mut self) -> Result<T, QueueError> {
        // SAFETY: &mut self, tidak ada consumer lain
        unsafe { self.consume_take() }
    }

    /// Drop semua elemen live
    pub fn clear(&mut self) {
        if mem::needs_drop::<T>() {
            while !self.is_empty() {
                let _ = self.pop_front();
            }
        } else {
            let write = *self.write.get_mut();
            *self.read.get_mut() = write;
        }
    }

    /// Pecah queue menjadi satu producer dan satu consumer.
    ///
    /// Keduanya `Send` tapi tidak `Sync` maupun `Clone`, jadi kontrak SPSC
    /// dijamin saat compile. Queue tidak bisa dipindah/di-drop selama
    /// handle masih hidup.
    pub fn split(&mut self) -> (Producer<'_, T, S>, Consumer<'_, T, S>) {
        let ring = NonNull::from(&*self);
        (
            Producer {
                ring,
                _marker: PhantomData,
            },
            Consumer {
                ring,
                _marker: PhantomData,
            },
        )
    }

    /// Majukan cursor satu langkah, reset ke 0 di ujung.
    ///
    /// Kapasitas tidak harus power of 2, jadi tanpa mask maupun `%`.
    #[inline(always)]
    fn bump(&self, pos: usize) -> usize {
        let next = pos + 1;
        if next >= self.capacity {
            0
        } else {
            next
        }
    }

    #[inline(always)]
    fn slot(&self, pos: usize) -> *mut T {
        debug_assert!(pos < self.capacity);
        // SAFETY: cursor selalu di [0, capacity) dan storage menjamin
        // slots().len() == capacity selama hidup
        unsafe { self.storage.slots().get_unchecked(pos).as_ptr() }
    }

    /// Posisi write kalau masih ada ruang (producer side)
    #[inline(always)]
    fn reserve(&self) -> Option<usize> {
        if self.capacity == 0 {
            return None;
        }

        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);

        if self.bump(write) == read {
            return None;
        }
        Some(write)
    }

    /// Tulis value ke slot `pos` lalu publish cursor write.
    ///
    /// # Safety
    /// `pos` harus hasil `reserve()` dari producer yang sama, tanpa publish di antaranya.
    #[inline(always)]
    unsafe fn commit(&self, pos: usize, value: T) {
        // SAFETY: slot di luar [read, write), consumer tidak menyentuhnya
        unsafe { self.slot(pos).write(value) };

        // Release: elemen harus visible sebelum cursor baru
        self.write.store(self.bump(pos), Ordering::Release);
    }

    /// # Safety
    /// Hanya boleh dipanggil dari satu producer pada satu waktu.
    #[inline(always)]
    unsafe fn produce(&self, value: T) -> Result<(), PushError<T>> {
        match self.reserve() {
            Some(pos) => {
                unsafe { self.commit(pos, value) };
                Ok(())
            }
            None => Err(PushError(value)),
        }
    }

    /// # Safety
    /// Hanya boleh dipanggil dari satu producer pada satu waktu.
    #[inline(always)]
    unsafe fn produce_with<F>(&self, make: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> T,
    {
        let pos = self.reserve().ok_or(QueueError::Overflow)?;
        unsafe { self.commit(pos, make()) };
        Ok(())
    }

    /// Posisi read kalau ada elemen (consumer side)
    #[inline(always)]
    fn occupied(&self) -> Option<usize> {
        let read = self.read.load(Ordering::Relaxed);
        // Acquire: pasangan dari Release di commit()
        let write = self.write.load(Ordering::Acquire);

        if read == write {
            return None;
        }
        Some(read)
    }

    /// # Safety
    /// Hanya boleh dipanggil dari satu consumer; referensi harus dilepas sebelum pop.
    #[inline(always)]
    unsafe fn peek(&self) -> Result<&T, QueueError> {
        let pos = self.occupied().ok_or(QueueError::Underflow)?;
        // SAFETY: slot di [read, write) sudah diinisialisasi producer
        Ok(unsafe { &*self.slot(pos) })
    }

    /// # Safety
    /// Hanya boleh dipanggil dari satu consumer pada satu waktu.
    #[inline(always)]
    unsafe fn consume_drop(&self) -> Result<(), QueueError> {
        // Slot dikosongkan dan cursor dipublish dulu, baru elemen di-drop.
        // Kalau Drop milik T panic, slot sudah di luar [read, write).
        unsafe { self.consume_take() }.map(drop)
    }

    /// # Safety
    /// Hanya boleh dipanggil dari satu consumer pada satu waktu.
    #[inline(always)]
    unsafe fn consume_take(&self) -> Result<T, QueueError> {
        let pos = self.occupied().ok_or(QueueError::Underflow)?;
        let value = unsafe { self.slot(pos).read() };

        self.read.store(self.bump(pos), Ordering::Release);
        Ok(value)
    }
}

impl<T, S: Storage<T>> Drop for RingBuffer<T, S> {
    fn drop(&mut self) {
        if mem::needs_drop::<T>() {
            let live = self.available();
            if live > 0 {
                tracing::debug!(live, "dropping live elements with ring buffer");
            }
        }
        self.clear();
    }
}

impl<T, S: Storage<T>> fmt::Debug for RingBuffer<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("space", &self.space())
            .finish()
    }
}

/// Write end dari queue yang sudah di-split
///
/// `Send` tapi tidak `Sync`: bisa dipindah ke thread lain, tapi `&Producer`
/// tidak bisa dibagi sehingga tidak ada push bersamaan.
pub struct Producer<'a, T, S: Storage<T>> {
    ring: NonNull<RingBuffer<T, S>>,
    _marker: PhantomData<&'a mut RingBuffer<T, S>>,
}

/// Read end dari queue yang sudah di-split. Lihat [`Producer`] untuk thread safety.
pub struct Consumer<'a, T, S: Storage<T>> {
    ring: NonNull<RingBuffer<T, S>>,
    _marker: PhantomData<&'a mut RingBuffer<T, S>>,
}

// SAFETY: Producer hanya menulis slot bebas dan cursor write; Consumer hanya
// membaca/drop slot live dan cursor read. Serah terima elemen lewat pasangan
// Release/Acquire, jadi T cukup Send. Kontrak `Storage` menjamin `slots()`
// aman dipanggil dari kedua sisi sekaligus.
unsafe impl<T: Send, S: Storage<T> + Send> Send for Producer<'_, T, S> {}
unsafe impl<T: Send, S: Storage<T> + Send> Send for Consumer<'_, T, S> {}

macro_rules! impl_queries {
    ($handle:ident) => {
        impl<T, S: Storage<T>> $handle<'_, T, S> {
            #[inline(always)]
            fn ring(&self) -> &RingBuffer<T, S> {
                // SAFETY: ring di-borrow eksklusif selama 'a oleh split()
                unsafe { self.ring.as_ref() }
            }

            #[inline(always)]
            pub fn capacity(&self) -> usize {
                self.ring().capacity()
            }

            #[inline]
            pub fn available(&self) -> usize {
                self.ring().available()
            }

            #[inline]
            pub fn space(&self) -> usize {
                self.ring().space()
            }

            #[inline(always)]
            pub fn is_empty(&self) -> bool {
                self.ring().is_empty()
            }

            #[inline(always)]
            pub fn is_full(&self) -> bool {
                self.ring().is_full()
            }
        }

        impl<T, S: Storage<T>> fmt::Debug for $handle<'_, T, S> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($handle)).field(self.ring()).finish()
            }
        }
    };
}

impl_queries!(Producer);
impl_queries!(Consumer);

impl<T, S: Storage<T>> Producer<'_, T, S> {
    /// Push data ke buffer (Producer side). Zero-allocation, lock-free.
    #[inline]
    pub fn push_back(&mut self, value: T) -> Result<(), PushError<T>> {
        // SAFETY: hanya ada satu Producer per split dan ia tidak Sync
        unsafe { self.ring().produce(value) }
    }

    #[inline]
    pub fn push_back_cloned(&mut self, value: &T) -> Result<(), QueueError>
    where
        T: Clone,
    {
        unsafe { self.ring().produce_with(|| value.clone()) }
    }

    #[inline]
    pub fn emplace_back<F>(&mut self, make: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> T,
    {
        unsafe { self.ring().produce_with(make) }
    }
}

impl<T, S: Storage<T>> Consumer<'_, T, S> {
    /// Referensi ke elemen terdepan, valid sampai `pop_front`/`take_front` berikutnya
    #[inline]
    pub fn front(&self) -> Result<&T, QueueError> {
        // SAFETY: satu Consumer per split; pop butuh &mut self jadi
        // referensi ini harus sudah dilepas
        unsafe { self.ring().peek() }
    }

    /// Pop data dari buffer (Consumer side), elemen di-drop di tempat
    #[inline]
    pub fn pop_front(&mut self) -> Result<(), QueueError> {
        unsafe { self.ring().consume_drop() }
    }

    #[inline]
    pub fn take_front(&mut self) -> Result<T, QueueError> {
        unsafe { self.ring().consume_take() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    /// Menghitung drop supaya bisa cek tiap elemen di-drop tepat sekali
    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_fresh_queue_state() {
        let rb: RingBuffer<i32, InlineStorage<i32, 8>> = RingBuffer::inline();

        assert!(rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.capacity(), 8);
        assert_eq!(rb.space(), rb.capacity() - 1);
        assert_eq!(rb.available(), 0);
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut rb: RingBuffer<i32, InlineStorage<i32, 8>> = RingBuffer::inline();

        assert_eq!(rb.pop_front(), Err(QueueError::Underflow));
        assert_eq!(rb.front().err(), Some(QueueError::Underflow));
        assert_eq!(rb.take_front(), Err(QueueError::Underflow));
        assert!(rb.is_empty());
        assert_eq!(rb.space(), 7);
    }

    #[test]
    fn test_push_one() {
        let mut rb: RingBuffer<i32, InlineStorage<i32, 8>> = RingBuffer::inline();
        rb.push_back(42).unwrap();

        assert!(!rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.space(), rb.capacity() - 2);
        assert_eq!(rb.available(), 1);
        assert_eq!(rb.front(), Ok(&42));
    }

    #[test]
    fn test_push_pop_restores_state() {
        let mut rb: RingBuffer<i32, InlineStorage<i32, 8>> = RingBuffer::inline();
        rb.push_back(42).unwrap();
        rb.pop_front().unwrap();

        assert!(rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.space(), rb.capacity() - 1);
        assert_eq!(rb.available(), 0);
    }

    #[test]
    fn test_wraparound() {
        let mut rb: RingBuffer<i32, InlineStorage<i32, 8>> = RingBuffer::inline();
        let n = 11 * rb.capacity() as i32 / 7;

        for i in 0..n {
            rb.push_back(i).unwrap();
            rb.pop_front().unwrap();
        }

        rb.push_back(n).unwrap();
        assert_eq!(rb.front(), Ok(&n));
    }

    #[test]
    fn test_full_buffer() {
        let mut rb: RingBuffer<i32, HeapStorage<i32>> = RingBuffer::with_capacity(8);
        for i in 0..rb.capacity() - 1 {
            rb.push_back(i as i32).unwrap();
        }

        assert!(!rb.is_empty());
        assert!(rb.is_full());
        assert_eq!(rb.space(), 0);
        assert_eq!(rb.available(), rb.capacity() - 1);

        let err = rb.push_back(42).unwrap_err();
        assert_eq!(err.into_inner(), 42);
        assert_eq!(rb.available(), rb.capacity() - 1);

        // Setelah satu pop, push harus berhasil lagi
        assert_eq!(rb.take_front(), Ok(0));
        rb.push_back(42).unwrap();
        assert!(rb.is_full());
    }

    #[test]
    fn test_emplace_not_called_when_full() {
        let mut rb: RingBuffer<String, HeapStorage<String>> = RingBuffer::with_capacity(2);
        rb.emplace_back(|| "first".to_string()).unwrap();

        let called = Cell::new(false);
        let result = rb.emplace_back(|| {
            called.set(true);
            "second".to_string()
        });

        assert_eq!(result, Err(QueueError::Overflow));
        assert!(!called.get());
        assert_eq!(rb.front().map(String::as_str), Ok("first"));
    }

    #[test]
    fn test_push_cloned_keeps_original() {
        let mut rb: RingBuffer<Vec<u8>, HeapStorage<Vec<u8>>> = RingBuffer::with_capacity(3);
        let value = vec![1, 2, 3];

        rb.push_back_cloned(&value).unwrap();
        rb.push_back_cloned(&value).unwrap();
        assert_eq!(rb.push_back_cloned(&value), Err(QueueError::Overflow));

        assert_eq!(value, vec![1, 2, 3]);
        assert_eq!(rb.take_front(), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn test_elements_dropped_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut rb: RingBuffer<DropCounter, InlineStorage<DropCounter, 4>> =
                RingBuffer::inline();
            for _ in 0..3 {
                assert!(rb.push_back(DropCounter(drops.clone())).is_ok());
            }

            rb.pop_front().unwrap();
            assert_eq!(drops.get(), 1);

            let taken = rb.take_front().unwrap();
            assert_eq!(drops.get(), 1);
            drop(taken);
            assert_eq!(drops.get(), 2);
        }
        // Sisa satu elemen di-drop bersama queue
        assert_eq!(drops.get(), 3);
    }

    /// Elemen yang Drop-nya panic kalau `explode` diset
    struct Explosive {
        drops: Rc<Cell<usize>>,
        explode: bool,
    }

    impl Drop for Explosive {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
            if self.explode {
                panic!("element destructor failed");
            }
        }
    }

    #[test]
    fn test_panicking_drop_in_pop_front_is_not_repeated() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut rb: RingBuffer<Explosive, HeapStorage<Explosive>> =
                RingBuffer::with_capacity(4);
            for explode in [true, false] {
                assert!(rb
                    .push_back(Explosive {
                        drops: drops.clone(),
                        explode,
                    })
                    .is_ok());
            }

            let result = catch_unwind(AssertUnwindSafe(|| rb.pop_front()));
            assert!(result.is_err());

            // Slot yang panic sudah keluar dari queue
            assert_eq!(drops.get(), 1);
            assert_eq!(rb.available(), 1);
            assert!(rb.front().map(|e| !e.explode).unwrap());
        }
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_panicking_drop_in_clear_is_not_repeated() {
        let drops = Rc::new(Cell::new(0));
        let mut rb: RingBuffer<Explosive, InlineStorage<Explosive, 8>> = RingBuffer::inline();
        for explode in [false, true, false, false] {
            assert!(rb
                .push_back(Explosive {
                    drops: drops.clone(),
                    explode,
                })
                .is_ok());
        }

        let result = catch_unwind(AssertUnwindSafe(|| rb.clear()));
        assert!(result.is_err());
        assert_eq!(drops.get(), 2);
        assert_eq!(rb.available(), 2);

        rb.clear();
        assert_eq!(drops.get(), 4);
        assert!(rb.is_empty());

        drop(rb);
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn test_rejected_push_returns_value_without_drop() {
        let drops = Rc::new(Cell::new(0));
        let mut rb: RingBuffer<DropCounter, HeapStorage<DropCounter>> =
            RingBuffer::with_capacity(2);

        assert!(rb.push_back(DropCounter(drops.clone())).is_ok());
        let rejected = rb.push_back(DropCounter(drops.clone())).unwrap_err();
        assert_eq!(drops.get(), 0);

        drop(rejected);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_unbound_queue() {
        let mut rb: RingBuffer<u32, HeapStorage<u32>> = RingBuffer::default();

        assert_eq!(rb.capacity(), 0);
        assert!(rb.is_empty());
        assert!(rb.is_full());
        assert_eq!(rb.available(), 0);
        assert_eq!(rb.space(), 0);
        assert!(rb.push_back(1).is_err());
        assert_eq!(rb.pop_front(), Err(QueueError::Underflow));

        rb.init(HeapStorage::new(4));
        assert_eq!(rb.capacity(), 4);
        assert_eq!(rb.space(), 3);
        rb.push_back(1).unwrap();
        assert_eq!(rb.front(), Ok(&1));
    }

    #[test]
    fn test_init_drops_previous_elements() {
        let drops = Rc::new(Cell::new(0));
        let mut rb: RingBuffer<DropCounter, HeapStorage<DropCounter>> =
            RingBuffer::with_capacity(4);
        for _ in 0..2 {
            assert!(rb.push_back(DropCounter(drops.clone())).is_ok());
        }

        rb.init(HeapStorage::new(8));
        assert_eq!(drops.get(), 2);
        assert!(rb.is_empty());
        assert_eq!(rb.space(), 7);
    }

    #[test]
    fn test_capacity_one_is_always_full() {
        let mut rb: RingBuffer<u8, InlineStorage<u8, 1>> = RingBuffer::inline();

        assert!(rb.is_empty());
        assert!(rb.is_full());
        assert!(rb.push_back(1).is_err());
    }

    #[test]
    fn test_borrowed_region() {
        let mut region = [MaybeUninit::<u64>::uninit(); 4];
        let mut rb = RingBuffer::from_region(&mut region);

        for i in 0..3 {
            rb.push_back(i).unwrap();
        }
        assert!(rb.is_full());
        assert_eq!(rb.take_front(), Ok(0));
        assert_eq!(rb.take_front(), Ok(1));
        assert_eq!(rb.take_front(), Ok(2));
    }

    #[test]
    fn test_heap_queue_survives_move() {
        let mut rb: RingBuffer<String, HeapStorage<String>> = RingBuffer::with_capacity(4);
        rb.push_back("kept".to_string()).unwrap();

        let mut moved = Box::new(rb);
        assert_eq!(moved.front().map(String::as_str), Ok("kept"));
        moved.push_back("more".to_string()).unwrap();
        assert_eq!(moved.available(), 2);
    }

    #[test]
    fn test_invariant_across_wraparound() {
        let mut rb: RingBuffer<u32, HeapStorage<u32>> = RingBuffer::with_capacity(5);

        for round in 0..20u32 {
            for i in 0..(round % 4 + 1) {
                if rb.push_back(round * 10 + i).is_err() {
                    break;
                }
                assert_eq!(rb.available() + rb.space(), rb.capacity() - 1);
            }
            while rb.available() > round as usize % 2 {
                rb.pop_front().unwrap();
                assert_eq!(rb.available() + rb.space(), rb.capacity() - 1);
            }
        }
    }

    #[test]
    fn test_split_handles() {
        let mut rb: RingBuffer<u64, InlineStorage<u64, 4>> = RingBuffer::inline();
        {
            let (mut tx, mut rx) = rb.split();
            tx.push_back(1).unwrap();
            tx.emplace_back(|| 2).unwrap();
            tx.push_back_cloned(&3).unwrap();
            assert!(tx.is_full());
            assert!(tx.push_back(4).is_err());

            assert_eq!(rx.available(), 3);
            assert_eq!(rx.front(), Ok(&1));
            rx.pop_front().unwrap();
            assert_eq!(rx.take_front(), Ok(2));
            assert_eq!(tx.space(), 2);
        }
        assert_eq!(rb.take_front(), Ok(3));
        assert!(rb.is_empty());
    }
}
