//! Storage provider untuk ring buffer
//!
//! Storage hanya menyediakan region slot yang contiguous dan kapasitasnya.
//! Tidak ada logika concurrency di sini; semua itu ada di `RingBuffer`.
//!
//! - [`InlineStorage`]: region inline, kapasitas fixed saat compile, tanpa heap
//! - [`HeapStorage`]: region di heap, kapasitas ditentukan saat runtime
//! - [`BorrowedStorage`]: view non-owning ke memory milik caller
//! - [`MmapStorage`]: region anonymous mmap, page-aligned

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::mem::{align_of, size_of, MaybeUninit};
use std::ptr::NonNull;
use std::slice;

use memmap2::{MmapMut, MmapOptions};

use crate::error::StorageError;

/// Satu slot dalam ring buffer. Uninitialized kecuali sedang berisi elemen live.
#[repr(transparent)]
pub struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline(always)]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.data.get().cast()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Region slot yang di-bind ke ring buffer.
///
/// # Safety
///
/// `slots()` harus selalu mengembalikan slice yang sama (alamat dan panjang)
/// selama storage hidup. Ring buffer menyimpan kapasitas saat bind dan
/// mengakses slot lewat raw pointer berdasarkan asumsi ini.
///
/// Setelah [`RingBuffer::split`](crate::core::RingBuffer::split), `slots()`
/// dipanggil bersamaan dari thread producer dan consumer, jadi implementasi
/// tidak boleh memutasi state apa pun di dalamnya.
pub unsafe trait Storage<T> {
    fn slots(&self) -> &[Slot<T>];
}

/// Region inline dengan kapasitas `N` fixed saat compile
pub struct InlineStorage<T, const N: usize> {
    data: [Slot<T>; N],
}

impl<T, const N: usize> InlineStorage<T, N> {
    pub fn new() -> Self {
        Self {
            data: std::array::from_fn(|_| Slot::new()),
        }
    }
}

impl<T, const N: usize> Default for InlineStorage<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<T, const N: usize> Storage<T> for InlineStorage<T, N> {
    #[inline(always)]
    fn slots(&self) -> &[Slot<T>] {
        &self.data
    }
}

/// Region di heap, dialokasikan sekali saat konstruksi.
///
/// Memindahkan `HeapStorage` hanya memindahkan pointer-nya; region tetap di
/// alamat yang sama. Region dibebaskan tepat sekali saat drop.
pub struct HeapStorage<T> {
    data: Box<[Slot<T>]>,
}

impl<T> HeapStorage<T> {
    pub fn new(capacity: usize) -> Self {
        // Slot uninitialized, jadi ini hanya alokasi tanpa menulis elemen
        let data: Box<[Slot<T>]> = (0..capacity).map(|_| Slot::new()).collect();
        Self { data }
    }
}

impl<T> Default for HeapStorage<T> {
    fn default() -> Self {
        Self { data: Box::new([]) }
    }
}

unsafe impl<T> Storage<T> for HeapStorage<T> {
    #[inline(always)]
    fn slots(&self) -> &[Slot<T>] {
        &self.data
    }
}

/// View non-owning ke region milik caller. Region harus hidup lebih lama dari queue.
pub struct BorrowedStorage<'a, T> {
    slots: &'a [Slot<T>],
}

impl<'a, T> BorrowedStorage<'a, T> {
    pub fn new(region: &'a mut [MaybeUninit<T>]) -> Self {
        let len = region.len();
        // SAFETY: Slot<T> repr(transparent) atas UnsafeCell<MaybeUninit<T>>, yang
        // layout-nya sama dengan MaybeUninit<T>. Kita memegang borrow eksklusif
        // selama 'a, jadi akses lewat UnsafeCell tidak bentrok dengan siapa pun.
        let slots = unsafe { slice::from_raw_parts(region.as_mut_ptr().cast::<Slot<T>>(), len) };
        Self { slots }
    }
}

impl<T> Default for BorrowedStorage<'_, T> {
    fn default() -> Self {
        Self { slots: &[] }
    }
}

unsafe impl<T> Storage<T> for BorrowedStorage<'_, T> {
    #[inline(always)]
    fn slots(&self) -> &[Slot<T>] {
        self.slots
    }
}

// SAFETY: BorrowedStorage secara efektif adalah &mut ke region; memindahkannya
// ke thread lain sama amannya dengan memindahkan elemen T.
unsafe impl<T: Send> Send for BorrowedStorage<'_, T> {}

/// Alignment minimum region mmap (ukuran page terkecil yang umum)
const MIN_PAGE_SIZE: usize = 4096;

/// Region anonymous mmap
///
/// Page-aligned dan di luar heap allocator, cocok untuk queue besar.
/// Region di-unmap saat drop.
pub struct MmapStorage<T> {
    // Disimpan agar mapping tetap hidup; akses lewat `ptr`
    _mmap: MmapMut,
    ptr: NonNull<Slot<T>>,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> MmapStorage<T> {
    /// Map region anonymous untuk `capacity` slot
    pub fn anonymous(capacity: usize) -> Result<Self, StorageError> {
        if size_of::<T>() == 0 {
            return Err(StorageError::ZeroSizedElement);
        }
        if align_of::<T>() > MIN_PAGE_SIZE {
            return Err(StorageError::OverAligned {
                align: align_of::<T>(),
                page: MIN_PAGE_SIZE,
            });
        }

        let len = capacity
            .checked_mul(size_of::<Slot<T>>())
            .filter(|&len| len <= isize::MAX as usize)
            .ok_or(StorageError::CapacityOverflow(capacity))?;

        // Mapping kosong tidak valid, minimal satu byte
        let mut mmap = MmapOptions::new().len(len.max(1)).map_anon()?;

        let ptr = NonNull::new(mmap.as_mut_ptr().cast::<Slot<T>>())
            .ok_or(StorageError::CapacityOverflow(capacity))?;

        Ok(Self {
            _mmap: mmap,
            ptr,
            capacity,
            _marker: PhantomData,
        })
    }
}

unsafe impl<T> Storage<T> for MmapStorage<T> {
    #[inline(always)]
    fn slots(&self) -> &[Slot<T>] {
        // SAFETY: mapping berukuran capacity * size_of::<Slot<T>>, page-aligned
        // (alignment T sudah dicek), dan hidup selama self.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }
}

// SAFETY: MmapStorage memiliki region-nya secara eksklusif seperti Box
unsafe impl<T: Send> Send for MmapStorage<T> {}
