//! # Page Table Abstraction
//!
//! The uniform per-level interface [`translate`](crate::translate) walks.
//!
//! An implementation answers questions about its own entry format and
//! nothing else: how to read an entry, whether a non-leaf entry may be
//! followed, where it leads, whether a leaf is present, which frame a leaf
//! names, and what access an entry grants. Splitting the address and
//! composing the result stays in the walker, driven by
//! [`geometry`](PageTable::geometry).
//!
//! All methods take `&self`: a walk never modifies the tables it reads.

use crate::PagingGeometry;
use kernel_memory_addresses::PhysicalAddress;

/// Access an entry grants to user mode.
///
/// Permissions narrow on the way down: a page is only as accessible as the
/// least permissive entry on its path. See [`Access::narrow`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Access {
    /// Reachable from user mode at all.
    pub user: bool,
    /// Writable (from user mode, if `user` is set).
    pub writable: bool,
}

impl Access {
    /// User-readable and user-writable.
    pub const USER_RW: Self = Self {
        user: true,
        writable: true,
    };

    /// What remains allowed after passing through an entry granting `other`.
    #[inline]
    #[must_use]
    pub const fn narrow(self, other: Self) -> Self {
        Self {
            user: self.user && other.user,
            writable: self.writable && other.writable,
        }
    }
}

/// One page-table format, viewed read-only.
pub trait PageTable {
    /// A raw entry as stored in a table.
    type Entry: Copy;

    /// Reference to a table (e.g. the physical frame holding it).
    type TableRef: Copy;

    /// Shape of the hierarchy.
    fn geometry(&self) -> PagingGeometry;

    /// Read the entry at `index` of `table`.
    ///
    /// `index` is always below [`PagingGeometry::entries_per_table`].
    fn entry_at(&self, table: Self::TableRef, index: usize) -> Self::Entry;

    /// Whether a non-leaf entry may be followed: present, and not flagged
    /// as malformed for this format.
    fn is_valid_subtree(&self, entry: Self::Entry) -> bool;

    /// The table a valid non-leaf entry points to.
    ///
    /// Only called after [`is_valid_subtree`](Self::is_valid_subtree)
    /// returned `true` for `entry`.
    fn next_table(&self, entry: Self::Entry) -> Self::TableRef;

    /// Whether a leaf entry currently maps physical memory.
    fn is_present(&self, entry: Self::Entry) -> bool;

    /// The frame base named by a present leaf entry.
    ///
    /// Implementations should strip their flag bits; the walker masks the
    /// result with [`PagingGeometry::frame_mask`] regardless.
    fn frame_base(&self, entry: Self::Entry) -> PhysicalAddress;

    /// Access granted by `entry`, considered on its own.
    ///
    /// Called for every entry on a path, links and leaf alike; formats
    /// without access control return [`Access::USER_RW`].
    fn access(&self, entry: Self::Entry) -> Access;
}

impl<T: PageTable + ?Sized> PageTable for &T {
    type Entry = T::Entry;
    type TableRef = T::TableRef;

    #[inline]
    fn geometry(&self) -> PagingGeometry {
        (**self).geometry()
    }

    #[inline]
    fn entry_at(&self, table: Self::TableRef, index: usize) -> Self::Entry {
        (**self).entry_at(table, index)
    }

    #[inline]
    fn is_valid_subtree(&self, entry: Self::Entry) -> bool {
        (**self).is_valid_subtree(entry)
    }

    #[inline]
    fn next_table(&self, entry: Self::Entry) -> Self::TableRef {
        (**self).next_table(entry)
    }

    #[inline]
    fn is_present(&self, entry: Self::Entry) -> bool {
        (**self).is_present(entry)
    }

    #[inline]
    fn frame_base(&self, entry: Self::Entry) -> PhysicalAddress {
        (**self).frame_base(entry)
    }

    #[inline]
    fn access(&self, entry: Self::Entry) -> Access {
        (**self).access(entry)
    }
}
