//! # Physical Memory Access
//!
//! Rust code can only dereference virtual addresses. A [`PhysMapper`] turns
//! a physical address into a pointer that is usable in the current address
//! space, so page tables (and caller buffers, once translated) can be read.
//!
//! Typical patterns:
//! - **Loader**: identity-maps low memory; the pointer equals the address.
//! - **Kernel**: uses a higher-half direct map (HHDM) and adds a constant.

use kernel_memory_addresses::PhysicalAddress;

/// Converts physical addresses into pointers in the current address space.
pub trait PhysMapper {
    /// Pointer through which the bytes at `pa` can be accessed.
    ///
    /// Producing the pointer is safe; dereferencing it is only sound if the
    /// mapping actually covers `pa` for at least `size_of::<T>()` bytes and
    /// the memory holds a valid `T`.
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T;
}

/// [`PhysMapper`] for a linear direct map: every physical address `pa` is
/// visible at `base + pa`.
///
/// `base` is configuration of the hosting kernel (its HHDM offset), or zero
/// for identity-mapped memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HhdmMapper {
    base: u64,
}

impl HhdmMapper {
    #[inline]
    #[must_use]
    pub const fn new(base: u64) -> Self {
        Self { base }
    }

    #[inline]
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }
}

impl PhysMapper for HhdmMapper {
    #[inline]
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        self.base.wrapping_add(pa.as_u64()) as *mut T
    }
}
