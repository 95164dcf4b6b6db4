//! # Address Space Handle
//!
//! Names one page-table hierarchy: a borrowed [`PageTable`] implementation
//! and the reference to its root table. The handle never owns the tables;
//! whoever hands it out keeps the hierarchy alive and stable for as long as
//! the borrow lasts.

use crate::{PageTable, Translation, TranslationError, translate, walk};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Handle to a single, concrete address space.
pub struct AddressSpace<'t, T: PageTable + ?Sized> {
    tables: &'t T,
    root: T::TableRef,
}

impl<'t, T: PageTable + ?Sized> AddressSpace<'t, T> {
    #[inline]
    #[must_use]
    pub const fn new(tables: &'t T, root: T::TableRef) -> Self {
        Self { tables, root }
    }

    /// The top-level table of this space.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> T::TableRef {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn tables(&self) -> &'t T {
        self.tables
    }

    /// Translate `va` in this space. See [`translate`].
    ///
    /// # Errors
    /// [`TranslationError::Unmapped`] if no physical memory backs `va`.
    #[inline]
    pub fn translate(&self, va: VirtualAddress) -> Result<PhysicalAddress, TranslationError> {
        translate(self, va)
    }

    /// Walk `va` in this space. See [`walk`].
    ///
    /// # Errors
    /// [`TranslationError::Unmapped`] if no physical memory backs `va`.
    #[inline]
    pub fn walk(&self, va: VirtualAddress) -> Result<Translation, TranslationError> {
        walk(self, va)
    }
}

impl<T: PageTable + ?Sized> Clone for AddressSpace<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: PageTable + ?Sized> Copy for AddressSpace<'_, T> {}
