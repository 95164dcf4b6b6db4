//! # x86-64 Page Tables
//!
//! [`PageTable`] over real x86-64 tables: 4 KiB-aligned arrays of 512
//! [`PageEntryBits`], located by physical frame and read through a
//! [`PhysMapper`].
//!
//! ## Entry rules
//!
//! | Check | Condition |
//! |:------|:----------|
//! | valid subtree (PML5E/PML4E/PDPTE/PDE) | `P=1`, `PS=0`, no frame bits above the physical width |
//! | present (PTE) | `P=1`, no frame bits above the physical width |
//! | frame base (PTE) | bits `12..phys_addr_bits` |
//! | access (every level) | `US` and `RW`, narrowed along the path |
//!
//! A PDPTE or PDE with `PS=1` maps a huge page. Huge pages are not followed,
//! so such an entry is malformed from this walker's point of view. The
//! same goes for any entry whose frame lies beyond the physical address
//! width: those bits are reserved, and the CPU rejects the entry instead of
//! truncating it.
//!
//! ## Reads
//!
//! Entries are read with a single volatile 8-byte load, the same way the
//! MMU reads them. The tables may change underneath (e.g. the CPU setting
//! the accessed bit, or a concurrent unmap); each entry is observed as it is
//! at the moment of its read, and nothing more is promised.

use crate::entry_bits::FRAME_FIELD_MASK;
use crate::{Access, AddressSpace, GeometryError, PageEntryBits, PageTable, PagingGeometry, PhysMapper};
use kernel_memory_addresses::PhysicalAddress;

/// Number of entries in every x86-64 table.
pub const ENTRIES_PER_TABLE: usize = 512;

/// Physical frame holding one x86-64 page table.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TableFrame(PhysicalAddress);

impl TableFrame {
    /// Frame starting at `base`. The low 12 bits are dropped.
    #[inline]
    #[must_use]
    pub const fn from_addr(base: PhysicalAddress) -> Self {
        Self(PhysicalAddress::new(base.as_u64() & !0xFFF))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.0
    }
}

/// The x86-64 table format, reached through a [`PhysMapper`].
pub struct X86PageTables<'m, M: PhysMapper> {
    mapper: &'m M,
    geometry: PagingGeometry,
}

impl<'m, M: PhysMapper> X86PageTables<'m, M> {
    /// View tables through `mapper` with the given geometry.
    ///
    /// # Errors
    /// [`GeometryError::UnsupportedFormat`] unless the geometry uses 4 KiB
    /// pages, 9-bit indices, 4 or 5 levels, and at most 52 physical bits.
    pub const fn new(mapper: &'m M, geometry: PagingGeometry) -> Result<Self, GeometryError> {
        let supported = geometry.page_shift() == 12
            && geometry.index_bits() == 9
            && (geometry.levels() == 4 || geometry.levels() == 5)
            && geometry.phys_addr_bits() <= 52;
        if !supported {
            return Err(GeometryError::UnsupportedFormat {
                expected: "x86-64 4/5-level paging with 4 KiB pages",
                actual: geometry,
            });
        }
        Ok(Self { mapper, geometry })
    }

    /// Handle for the hierarchy whose root table lives at `root`.
    #[inline]
    #[must_use]
    pub const fn address_space(&self, root: PhysicalAddress) -> AddressSpace<'_, Self> {
        AddressSpace::new(self, TableFrame::from_addr(root))
    }

    /// Handle for the hierarchy the CPU is currently translating with.
    ///
    /// # Safety
    /// - Must run at CPL0 with paging enabled.
    /// - `self` must use the paging mode the CPU is in (4- vs 5-level).
    /// - The active hierarchy must stay alive while the handle is used.
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    #[inline]
    #[must_use]
    pub unsafe fn active_address_space(&self) -> AddressSpace<'_, Self> {
        let root = unsafe { crate::root::RootRegister::read() };
        self.address_space(root.root_table())
    }

    #[inline]
    #[must_use]
    pub const fn mapper(&self) -> &'m M {
        self.mapper
    }

    /// Frame bits that are not addressable with this geometry's physical
    /// width. An entry with any of them set is malformed.
    #[inline]
    const fn unaddressable_frame_bits(&self) -> u64 {
        FRAME_FIELD_MASK & !self.geometry.frame_mask()
    }
}

impl<M: PhysMapper> PageTable for X86PageTables<'_, M> {
    type Entry = PageEntryBits;
    type TableRef = TableFrame;

    #[inline]
    fn geometry(&self) -> PagingGeometry {
        self.geometry
    }

    fn entry_at(&self, table: TableFrame, index: usize) -> PageEntryBits {
        debug_assert!(index < ENTRIES_PER_TABLE);
        if index >= ENTRIES_PER_TABLE {
            return PageEntryBits::new();
        }

        let base: *const u64 = self.mapper.phys_to_ptr(table.base());
        // SAFETY: The address space handle guarantees `table` is a live,
        // mapped 4 KiB table; `index` is in bounds and entries are 8-byte
        // aligned within it.
        let raw = unsafe { core::ptr::read_volatile(base.add(index)) };
        PageEntryBits::from_bits(raw)
    }

    #[inline]
    fn is_valid_subtree(&self, entry: PageEntryBits) -> bool {
        entry.present()
            && !entry.large_page()
            && entry.into_bits() & self.unaddressable_frame_bits() == 0
    }

    #[inline]
    fn next_table(&self, entry: PageEntryBits) -> TableFrame {
        TableFrame::from_addr(entry.physical_address())
    }

    #[inline]
    fn is_present(&self, entry: PageEntryBits) -> bool {
        entry.present() && entry.into_bits() & self.unaddressable_frame_bits() == 0
    }

    #[inline]
    fn frame_base(&self, entry: PageEntryBits) -> PhysicalAddress {
        entry.physical_address()
    }

    #[inline]
    fn access(&self, entry: PageEntryBits) -> Access {
        Access {
            user: entry.user_access(),
            writable: entry.writable(),
        }
    }
}
