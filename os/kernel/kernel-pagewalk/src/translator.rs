//! # Address Translator
//!
//! Walks one [`AddressSpace`] from the root table down to the leaf for a
//! single virtual address.
//!
//! The walk has `L + 1` exits for an `L`-level hierarchy: one failure per
//! non-leaf level, the leaf presence check, and success. It never goes back
//! up, never reads an entry behind one that failed, and never writes.

use crate::{Access, AddressSpace, PageTable};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Why a translation produced no address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// No physical memory currently backs the address: an entry on the way
    /// down was absent or malformed, or the leaf was not present.
    #[error("virtual address is not mapped")]
    Unmapped,
}

/// A successful walk: where `va` lives and what the path to it allows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Physical address backing the translated byte.
    pub phys: PhysicalAddress,
    /// Access granted by every entry on the path, narrowed top to leaf.
    pub access: Access,
}

/// Translate `va` into the physical address backing it in `space`.
///
/// ```text
/// PA = (frame_base(leaf) & FRAME_MASK) | (va & OFFSET_MASK)
/// ```
///
/// # Errors
/// [`TranslationError::Unmapped`] if any non-leaf entry fails
/// [`PageTable::is_valid_subtree`] or the leaf fails
/// [`PageTable::is_present`].
pub fn translate<T: PageTable + ?Sized>(
    space: &AddressSpace<'_, T>,
    va: VirtualAddress,
) -> Result<PhysicalAddress, TranslationError> {
    walk(space, va).map(|t| t.phys)
}

/// [`translate`], also reporting the effective [`Access`] of the mapping.
///
/// Reads exactly the same entries as [`translate`].
///
/// # Errors
/// As for [`translate`].
pub fn walk<T: PageTable + ?Sized>(
    space: &AddressSpace<'_, T>,
    va: VirtualAddress,
) -> Result<Translation, TranslationError> {
    let tables = space.tables();
    let geometry = tables.geometry();

    let mut access = Access::USER_RW;
    let mut table = space.root();
    for level in (2..=geometry.levels()).rev() {
        let entry = tables.entry_at(table, geometry.index(va, level));
        if !tables.is_valid_subtree(entry) {
            return Err(TranslationError::Unmapped);
        }
        access = access.narrow(tables.access(entry));
        table = tables.next_table(entry);
    }

    let leaf = tables.entry_at(table, geometry.index(va, 1));
    if !tables.is_present(leaf) {
        return Err(TranslationError::Unmapped);
    }

    let frame = tables.frame_base(leaf).as_u64() & geometry.frame_mask();
    let offset = va.as_u64() & geometry.offset_mask();
    Ok(Translation {
        phys: PhysicalAddress::new(frame | offset),
        access: access.narrow(tables.access(leaf)),
    })
}
