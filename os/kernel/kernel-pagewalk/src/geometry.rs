//! # Paging Geometry
//!
//! The numbers that decide how a virtual address is cut into per-level
//! indices and an in-page offset, and which entry bits form a frame base.
//!
//! ```text
//!  63          virt_addr_bits                                  0
//! |  ignored  | idx[L] | idx[L-1] | ... | idx[1] |   offset    |
//!                 ^ index_bits each             ^ page_shift bits
//! ```
//!
//! Level numbering is bottom-up: level 1 is the leaf table, level
//! [`levels`](PagingGeometry::levels) is the root.

use kernel_memory_addresses::{PageSize, VirtualAddress};

/// Deepest hierarchy accepted by [`PagingGeometry::new`].
pub const MAX_LEVELS: u8 = 6;

/// Widest per-level index accepted by [`PagingGeometry::new`].
pub const MAX_INDEX_BITS: u8 = 16;

/// Shape of one page-table hierarchy.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PagingGeometry {
    page_shift: u8,
    index_bits: u8,
    levels: u8,
    phys_addr_bits: u8,
}

/// Rejected [`PagingGeometry`] parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("a hierarchy needs between 1 and 6 levels, got {0}")]
    LevelCount(u8),
    #[error("per-level index width must be between 1 and 16 bits, got {0}")]
    IndexWidth(u8),
    #[error("page shift {0} is outside 1..=63")]
    PageShift(u8),
    #[error("{0} bits of virtual address do not fit in 64")]
    VirtualWidth(u32),
    #[error("physical address width {bits} must exceed the page shift {page_shift} and be at most 64")]
    PhysicalWidth { bits: u8, page_shift: u8 },
    #[error("table format requires {expected}, got {actual:?}")]
    UnsupportedFormat {
        expected: &'static str,
        actual: PagingGeometry,
    },
}

impl PagingGeometry {
    /// x86-64, 4-level paging (PML4), 4 KiB pages, 52-bit physical addresses.
    pub const X86_64_4LEVEL: Self = Self {
        page_shift: 12,
        index_bits: 9,
        levels: 4,
        phys_addr_bits: 52,
    };

    /// x86-64, 5-level paging (LA57), 4 KiB pages, 52-bit physical addresses.
    pub const X86_64_5LEVEL: Self = Self {
        page_shift: 12,
        index_bits: 9,
        levels: 5,
        phys_addr_bits: 52,
    };

    /// Validate and build a geometry.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] when any field is out of range or the
    /// indices plus offset need more than 64 bits.
    pub const fn new(
        page_shift: u8,
        index_bits: u8,
        levels: u8,
        phys_addr_bits: u8,
    ) -> Result<Self, GeometryError> {
        if levels == 0 || levels > MAX_LEVELS {
            return Err(GeometryError::LevelCount(levels));
        }
        if index_bits == 0 || index_bits > MAX_INDEX_BITS {
            return Err(GeometryError::IndexWidth(index_bits));
        }
        if page_shift == 0 || page_shift > 63 {
            return Err(GeometryError::PageShift(page_shift));
        }
        let virt = page_shift as u32 + index_bits as u32 * levels as u32;
        if virt > 64 {
            return Err(GeometryError::VirtualWidth(virt));
        }
        if phys_addr_bits <= page_shift || phys_addr_bits > 64 {
            return Err(GeometryError::PhysicalWidth {
                bits: phys_addr_bits,
                page_shift,
            });
        }
        Ok(Self {
            page_shift,
            index_bits,
            levels,
            phys_addr_bits,
        })
    }

    /// Like [`new`](Self::new), taking the page shift from a granule marker.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    #[allow(clippy::cast_possible_truncation)]
    pub const fn for_page_size<S: PageSize>(
        index_bits: u8,
        levels: u8,
        phys_addr_bits: u8,
    ) -> Result<Self, GeometryError> {
        Self::new(S::SHIFT as u8, index_bits, levels, phys_addr_bits)
    }

    #[inline]
    #[must_use]
    pub const fn page_shift(self) -> u32 {
        self.page_shift as u32
    }

    #[inline]
    #[must_use]
    pub const fn page_size(self) -> u64 {
        1 << self.page_shift
    }

    #[inline]
    #[must_use]
    pub const fn index_bits(self) -> u32 {
        self.index_bits as u32
    }

    #[inline]
    #[must_use]
    pub const fn levels(self) -> u8 {
        self.levels
    }

    #[inline]
    #[must_use]
    pub const fn phys_addr_bits(self) -> u32 {
        self.phys_addr_bits as u32
    }

    /// Number of entries in every table.
    #[inline]
    #[must_use]
    pub const fn entries_per_table(self) -> usize {
        1 << self.index_bits
    }

    /// Virtual address bits consumed by the walk (indices plus offset).
    #[inline]
    #[must_use]
    pub const fn virt_addr_bits(self) -> u32 {
        self.page_shift() + self.index_bits() * self.levels as u32
    }

    /// Selects the in-page offset bits of an address.
    #[inline]
    #[must_use]
    pub const fn offset_mask(self) -> u64 {
        low_mask(self.page_shift())
    }

    /// Selects the frame-number bits of a leaf entry: bits
    /// `page_shift..phys_addr_bits`. Every flag bit is outside this mask.
    #[inline]
    #[must_use]
    pub const fn frame_mask(self) -> u64 {
        low_mask(self.phys_addr_bits()) & !self.offset_mask()
    }

    /// Table index for `level` (1 = leaf, [`levels`](Self::levels) = root).
    ///
    /// ### Debug assertions
    /// - Asserts `1 <= level <= levels`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self, va: VirtualAddress, level: u8) -> usize {
        debug_assert!(level >= 1 && level <= self.levels);
        let shift = self.page_shift() + self.index_bits() * (level as u32 - 1);
        ((va.as_u64() >> shift) & low_mask(self.index_bits())) as usize
    }

    /// Cut `va` into every per-level index and the in-page offset.
    #[must_use]
    pub const fn split(self, va: VirtualAddress) -> SplitAddress {
        let mut indices = [0; MAX_LEVELS as usize];
        let mut level = 1;
        while level <= self.levels {
            indices[level as usize - 1] = self.index(va, level);
            level += 1;
        }
        SplitAddress {
            indices,
            levels: self.levels,
            offset: va.as_u64() & self.offset_mask(),
        }
    }
}

/// A virtual address cut up by [`PagingGeometry::split`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SplitAddress {
    /// `indices[0]` is the leaf index.
    indices: [usize; MAX_LEVELS as usize],
    levels: u8,
    offset: u64,
}

impl SplitAddress {
    /// Index for `level` (1 = leaf).
    ///
    /// # Panics
    /// If `level` is 0 or above the geometry's level count.
    #[must_use]
    pub const fn index(&self, level: u8) -> usize {
        assert!(level >= 1 && level <= self.levels);
        self.indices[level as usize - 1]
    }

    /// Indices in walk order, root first.
    pub fn top_down(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices[..self.levels as usize].iter().rev().copied()
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

/// Mask of the lowest `bits` bits; saturates at 64.
#[inline(always)]
const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}
