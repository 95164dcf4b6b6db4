use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// Bits 12..=51 of an entry: the physical frame field.
pub(crate) const FRAME_FIELD_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Represents a single 64-bit x86-64 page table entry in its raw bitfield form.
///
/// This models the **common superset** of fields found in all four paging
/// levels (PML4E, PDPTE, PDE, PTE), as specified by the AMD64 and Intel
/// manuals.
///
/// ### Bit layout (canonical)
///
/// | Bits      | Name / Mnemonic   | Meaning |
/// |-----------|-------------------|----------|
/// | 0         | `P` (present)     | Valid entry if set |
/// | 1         | `RW`              | Writable if set |
/// | 2         | `US`              | User-mode accessible if set |
/// | 3         | `PWT`             | Write-through caching |
/// | 4         | `PCD`             | Disable caching |
/// | 5         | `A`               | Accessed |
/// | 6         | `D`               | Dirty (leaf only) |
/// | 7         | `PS`              | Large page flag (PAT in a PTE) |
/// | 8         | `G`               | Global (leaf only) |
/// | 9–11      | OS avail low      | Reserved for OS use |
/// | 12–51     | `addr`            | Physical frame bits [51:12] |
/// | 52–58     | OS avail high     | Reserved for OS use |
/// | 59–62     | `PKU` / OS use    | Protection key or OS use |
/// | 63        | `NX`              | Execute disable |
///
/// Everything outside bits 12..=51 is a flag as far as address composition
/// is concerned. [`physical_address`](Self::physical_address) only ever
/// returns the frame field.
///
/// ### Example
/// ```rust
/// # use kernel_memory_addresses::PhysicalAddress;
/// # use kernel_pagewalk::PageEntryBits;
/// let e = PageEntryBits::new_user_rw()
///     .with_no_execute(true)
///     .with_physical_address(PhysicalAddress::new(0xABCD_D000));
/// assert!(e.present());
/// assert_eq!(e.physical_address().as_u64(), 0xABCD_D000);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    ///
    /// Set if the entry points to a valid next-level table or a valid leaf
    /// mapping. Clear implies a not-present entry; the rest of the bits are
    /// then free for the OS (e.g. swap bookkeeping) and mean nothing here.
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU on first access.
    pub accessed: bool,

    /// Dirty (D, bit 6), **leaf only**.
    pub dirty: bool,

    /// Large Page / Page Size (PS, bit 7).
    ///
    /// In a PDPTE or PDE, set means the entry maps a 1 GiB / 2 MiB page
    /// directly. In a PTE the same position is PAT.
    pub large_page: bool,

    /// Global (G, bit 8), **leaf only**.
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical address bits [51:12] (bits 12..=51).
    #[bits(40)]
    phys_addr_bits_51_12: u64,

    /// OS-available (bits 52..=58).
    #[bits(7)]
    pub os_available_high: u8,

    /// Protection Key (PKU, bits 59..=62) if supported; otherwise OS use.
    #[bits(4)]
    pub protection_key: u8,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl PageEntryBits {
    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        // store bits [51:12]
        self.set_phys_addr_bits_51_12(phys.as_u64() >> 12);
    }

    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, phys: PhysicalAddress) -> Self {
        self.set_physical_address(phys);
        self
    }

    /// The frame base stored in bits 12..=51, with every flag bit stripped.
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.phys_addr_bits_51_12() << 12)
    }

    /// Link entry for an intermediate table reachable from user mode.
    #[inline]
    #[must_use]
    pub const fn new_table_link() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
    }

    #[inline]
    #[must_use]
    pub const fn new_user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_no_execute(true)
    }

    #[inline]
    #[must_use]
    pub const fn new_user_ro_nx() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(false)
            .with_user_access(true)
            .with_no_execute(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_field_excludes_flags() {
        let e = PageEntryBits::from_bits(u64::MAX);
        assert_eq!(e.physical_address().as_u64(), FRAME_FIELD_MASK);
    }

    #[test]
    fn set_physical_address_drops_offset_bits() {
        let e = PageEntryBits::new().with_physical_address(PhysicalAddress::new(0x1234_5FFF));
        assert_eq!(e.physical_address().as_u64(), 0x1234_5000);
        assert!(!e.present());
    }

    #[test]
    fn flag_positions() {
        assert_eq!(PageEntryBits::new().with_present(true).into_bits(), 1);
        assert_eq!(PageEntryBits::new().with_large_page(true).into_bits(), 1 << 7);
        assert_eq!(PageEntryBits::new().with_no_execute(true).into_bits(), 1 << 63);
    }
}
