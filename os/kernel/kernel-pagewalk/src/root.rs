//! # Root Table Register (CR3)
//!
//! Where the CPU keeps the physical base of the active top-level table.
//! Used to resolve "the current address space" into a walkable handle; see
//! [`X86PageTables::active_address_space`](crate::X86PageTables).

use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3 with PCID disabled (CR4.PCIDE = 0).
///
/// | Bits  | Field | Meaning |
/// |-------|-------|---------|
/// | 0–2   | –     | Reserved |
/// | 3     | PWT   | Write-through for root table accesses |
/// | 4     | PCD   | Cache disable for root table accesses |
/// | 5–11  | –     | Reserved |
/// | 12–51 | base  | Root table physical base >> 12 |
/// | 52–63 | –     | Reserved |
#[bitfield(u64)]
pub struct RootRegister {
    #[bits(3)]
    __: u8,

    pub pwt: bool,

    pub pcd: bool,

    #[bits(7)]
    __: u8,

    #[bits(40)]
    root_base_4k: u64,

    #[bits(12)]
    __: u16,
}

impl RootRegister {
    /// Register value pointing at the root table at `root`.
    ///
    /// `root` must be 4 KiB-aligned; the low bits are dropped.
    #[inline]
    #[must_use]
    pub const fn from_root_table(root: PhysicalAddress) -> Self {
        Self::new().with_root_base_4k(root.as_u64() >> 12)
    }

    /// Physical base of the root table (PML4 or PML5).
    #[inline]
    #[must_use]
    pub const fn root_table(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.root_base_4k() << 12)
    }

    /// Read CR3.
    ///
    /// # Safety
    /// Privileged instruction: must run at CPL0.
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    #[inline]
    #[must_use]
    pub unsafe fn read() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_base_ignores_cache_bits() {
        let r = RootRegister::from_bits(0x0000_0001_2345_6000 | (1 << 3) | (1 << 4));
        assert!(r.pwt());
        assert!(r.pcd());
        assert_eq!(r.root_table().as_u64(), 0x0000_0001_2345_6000);
    }

    #[test]
    fn from_root_table_round_trips_base() {
        let r = RootRegister::from_root_table(PhysicalAddress::new(0x7000));
        assert_eq!(r.into_bits(), 0x7000);
        assert_eq!(r.root_table().as_u64(), 0x7000);
    }
}
