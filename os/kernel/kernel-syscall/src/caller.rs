//! # Caller Memory
//!
//! Moving values across the user/kernel boundary.
//!
//! A system call receives raw user pointers. Before the kernel touches
//! them it has to establish that the whole range lies in user space and is
//! backed by memory in the caller's address space. [`CallerMemory`] is that
//! boundary: [`read_from_caller`](CallerMemory::read_from_caller) and
//! [`write_to_caller`](CallerMemory::write_to_caller) either move the
//! complete value or fail with a [`TransferFault`].
//!
//! [`PagedCallerMemory`] does not dereference user virtual addresses at
//! all. It walks each user page through the caller's own page tables and
//! accesses the backing frame through a [`PhysMapper`], so an unmapped user
//! page is a clean error instead of a kernel page fault, and SMAP never has
//! to be lifted. Since the MMU is bypassed, the walk's [`Access`] stands in
//! for its permission checks: every page must be user-accessible, and a
//! destination must also be writable.

use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ops::Range;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_pagewalk::{Access, AddressSpace, PageTable, PhysMapper};

/// A caller-supplied pointer to a `T`. Never dereferenced directly.
#[repr(transparent)]
pub struct UserPtr<T> {
    addr: VirtualAddress,
    _phantom: PhantomData<*const T>,
}

impl<T> UserPtr<T> {
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self {
            addr: VirtualAddress::new(addr),
            _phantom: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn addr(self) -> VirtualAddress {
        self.addr
    }
}

impl<T> Clone for UserPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for UserPtr<T> {}

impl<T> core::fmt::Debug for UserPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "UserPtr({})", self.addr)
    }
}

/// Types that can be copied to and from caller memory as raw bytes.
///
/// # Safety
/// Every byte pattern of `size_of::<Self>()` bytes must be a valid `Self`,
/// and `Self` must contain no padding.
pub unsafe trait Plain: Copy + 'static {}

unsafe impl Plain for u8 {}
unsafe impl Plain for u16 {}
unsafe impl Plain for u32 {}
unsafe impl Plain for u64 {}
unsafe impl Plain for usize {}
unsafe impl Plain for i64 {}

/// Caller memory could not be read or written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferFault {
    #[error("null caller pointer")]
    Null,
    #[error("caller range at {start} of {len} bytes leaves user space")]
    OutsideUserSpace { start: VirtualAddress, len: usize },
    #[error("caller page at {0} is not mapped")]
    NotMapped(VirtualAddress),
    #[error("caller page at {0} does not permit this access")]
    Protection(VirtualAddress),
}

/// Which way bytes move across the boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Direction {
    FromCaller,
    ToCaller,
}

impl Direction {
    const fn permits(self, access: Access) -> bool {
        match self {
            Self::FromCaller => access.user,
            Self::ToCaller => access.user && access.writable,
        }
    }
}

/// Byte-level access to the memory of the process that issued a request.
pub trait CallerMemory {
    /// Fill `dst` from caller memory starting at `src`.
    ///
    /// # Errors
    /// [`TransferFault`] if any byte of the range is inaccessible. `dst` is
    /// unspecified afterwards.
    fn copy_from_caller(&self, src: VirtualAddress, dst: &mut [u8]) -> Result<(), TransferFault>;

    /// Write `src` into caller memory starting at `dst`.
    ///
    /// # Errors
    /// [`TransferFault`] if any byte of the range is inaccessible. On error
    /// no byte has been written.
    fn copy_to_caller(&self, dst: VirtualAddress, src: &[u8]) -> Result<(), TransferFault>;

    /// Read one `T` from the caller.
    ///
    /// # Errors
    /// See [`copy_from_caller`](Self::copy_from_caller).
    fn read_from_caller<T: Plain>(&self, src: UserPtr<T>) -> Result<T, TransferFault> {
        let mut value = MaybeUninit::<T>::zeroed();
        // SAFETY: zeroed memory is initialized as bytes; `T: Plain` makes any
        // byte pattern written into it a valid `T`.
        let bytes = unsafe {
            core::slice::from_raw_parts_mut(value.as_mut_ptr().cast::<u8>(), size_of::<T>())
        };
        self.copy_from_caller(src.addr(), bytes)?;
        Ok(unsafe { value.assume_init() })
    }

    /// Write one `T` to the caller.
    ///
    /// # Errors
    /// See [`copy_to_caller`](Self::copy_to_caller).
    fn write_to_caller<T: Plain>(&self, dst: UserPtr<T>, value: T) -> Result<(), TransferFault> {
        // SAFETY: `T: Plain` has no padding, so all its bytes are initialized.
        let bytes = unsafe {
            core::slice::from_raw_parts(core::ptr::from_ref(&value).cast::<u8>(), size_of::<T>())
        };
        self.copy_to_caller(dst.addr(), bytes)
    }
}

/// Reject null pointers and ranges that wrap or reach into the upper half.
///
/// # Errors
/// [`TransferFault::Null`] or [`TransferFault::OutsideUserSpace`].
pub fn check_user_range(start: VirtualAddress, len: usize) -> Result<(), TransferFault> {
    if start.as_u64() == 0 {
        return Err(TransferFault::Null);
    }
    if len == 0 {
        return Ok(());
    }
    let last = start
        .checked_add(len as u64 - 1)
        .ok_or(TransferFault::OutsideUserSpace { start, len })?;
    if !start.is_lower_half() || !last.is_lower_half() {
        return Err(TransferFault::OutsideUserSpace { start, len });
    }
    Ok(())
}

/// [`CallerMemory`] backed by the caller's page tables.
pub struct PagedCallerMemory<'s, T: PageTable + ?Sized, M: PhysMapper> {
    space: AddressSpace<'s, T>,
    mapper: &'s M,
}

impl<'s, T: PageTable + ?Sized, M: PhysMapper> PagedCallerMemory<'s, T, M> {
    /// Access caller memory in `space`, reaching frames through `mapper`.
    #[inline]
    #[must_use]
    pub const fn new(space: AddressSpace<'s, T>, mapper: &'s M) -> Self {
        Self { space, mapper }
    }

    /// Walk `start..start+len` page by page, check each page permits
    /// `direction`, and hand every piece to `visit` as (backing frame
    /// address, range within the buffer).
    fn for_each_piece<F>(
        &self,
        start: VirtualAddress,
        len: usize,
        direction: Direction,
        mut visit: F,
    ) -> Result<(), TransferFault>
    where
        F: FnMut(PhysicalAddress, Range<usize>) -> Result<(), TransferFault>,
    {
        let page_size = self.space.tables().geometry().page_size();
        let mut done = 0usize;
        while done < len {
            let va = VirtualAddress::new(start.as_u64() + done as u64);
            let page = VirtualAddress::new(va.as_u64() & !(page_size - 1));
            let t = self.space.walk(va).map_err(|_| TransferFault::NotMapped(page))?;
            if !direction.permits(t.access) {
                return Err(TransferFault::Protection(page));
            }
            let pa = t.phys;
            let left_in_page = page_size - (va.as_u64() & (page_size - 1));
            let n = usize::try_from(left_in_page).map_or(len - done, |n| n.min(len - done));
            visit(pa, done..done + n)?;
            done += n;
        }
        Ok(())
    }

    fn frame_ptr(&self, pa: PhysicalAddress, va: VirtualAddress) -> Result<*mut u8, TransferFault> {
        let ptr: *mut u8 = self.mapper.phys_to_ptr(pa);
        if ptr.is_null() {
            return Err(TransferFault::NotMapped(va));
        }
        Ok(ptr)
    }
}

impl<T: PageTable + ?Sized, M: PhysMapper> CallerMemory for PagedCallerMemory<'_, T, M> {
    fn copy_from_caller(&self, src: VirtualAddress, dst: &mut [u8]) -> Result<(), TransferFault> {
        check_user_range(src, dst.len())?;
        self.for_each_piece(src, dst.len(), Direction::FromCaller, |pa, range| {
            let va = VirtualAddress::new(src.as_u64() + range.start as u64);
            let from = self.frame_ptr(pa, va)?;
            let to = &mut dst[range];
            // SAFETY: `pa` backs a mapped page of the caller and the piece
            // does not cross the end of that page.
            unsafe { core::ptr::copy_nonoverlapping(from.cast_const(), to.as_mut_ptr(), to.len()) };
            Ok(())
        })
    }

    fn copy_to_caller(&self, dst: VirtualAddress, src: &[u8]) -> Result<(), TransferFault> {
        check_user_range(dst, src.len())?;
        // Resolve every page before the first byte is written.
        self.for_each_piece(dst, src.len(), Direction::ToCaller, |pa, range| {
            let va = VirtualAddress::new(dst.as_u64() + range.start as u64);
            self.frame_ptr(pa, va).map(|_| ())
        })?;
        self.for_each_piece(dst, src.len(), Direction::ToCaller, |pa, range| {
            let va = VirtualAddress::new(dst.as_u64() + range.start as u64);
            let to = self.frame_ptr(pa, va)?;
            let from = &src[range];
            // SAFETY: as in `copy_from_caller`.
            unsafe { core::ptr::copy_nonoverlapping(from.as_ptr(), to, from.len()) };
            Ok(())
        })
    }
}
