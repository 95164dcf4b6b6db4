//! # Page-Table Walk
//!
//! Read-only translation of a virtual address into the physical address
//! backing it, by walking a multi-level page-table hierarchy.
//!
//! ## What you get
//! - [`translate`]: the walk itself. One entry per level, top to leaf, with
//!   early exit on the first bad entry. [`walk`] returns the same address
//!   together with the [`Access`] the path grants.
//! - [`PageTable`]: the per-level interface the walk is written against, so
//!   the same walk runs over real x86-64 tables or fabricated test tables.
//! - [`PagingGeometry`]: page size, index width, level count and physical
//!   address width as explicit, validated numbers.
//! - [`X86PageTables`]: the x86-64 table format, reached through a
//!   [`PhysMapper`] (HHDM or identity).
//! - [`AddressSpace`]: the borrowed handle naming which hierarchy to walk.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! With 4-level paging and 4 KiB pages, a 48-bit virtual address is divided
//! into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! Each index selects one of 512 (2⁹) 8-byte entries in the table of its
//! level. Non-leaf entries point at the next table; the PT entry holds the
//! physical frame base. The offset never enters the hierarchy:
//!
//! ```text
//! PA = (PTE & FRAME_MASK) | (VA & OFFSET_MASK)
//! ```
//!
//! Huge pages (PS=1 in a PDPTE or PDE) are not followed. This walker treats
//! them as malformed non-leaf entries and reports [`TranslationError::Unmapped`].
//!
//! ## Example
//!
//! Using the simulated RAM from the `sim` feature:
//!
//! ```rust
//! # #[cfg(feature = "sim")] {
//! use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
//! use kernel_pagewalk::sim::SimulatedMemory;
//! use kernel_pagewalk::{PageEntryBits, PagingGeometry, X86PageTables, translate};
//!
//! let mut ram = SimulatedMemory::with_frames(16);
//! let root = ram.new_root().unwrap();
//! ram.map_4k(
//!     root,
//!     VirtualAddress::new(0x0000_7F00_1234_5000),
//!     PhysicalAddress::new(0xABCD_D000),
//!     PageEntryBits::new_user_ro_nx(),
//! )
//! .unwrap();
//!
//! let tables = X86PageTables::new(&ram, PagingGeometry::X86_64_4LEVEL).unwrap();
//! let space = tables.address_space(root);
//! let pa = translate(&space, VirtualAddress::new(0x0000_7F00_1234_5ABC)).unwrap();
//! assert_eq!(pa.as_u64(), 0xABCD_DABC);
//!
//! let t = space.walk(VirtualAddress::new(0x0000_7F00_1234_5ABC)).unwrap();
//! assert!(t.access.user && !t.access.writable);
//! # }
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

pub mod address_space;
mod entry_bits;
pub mod geometry;
mod mapper;
pub mod root;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod table;
mod translator;
pub mod x86_64;

pub use crate::address_space::AddressSpace;
pub use crate::entry_bits::PageEntryBits;
pub use crate::geometry::{GeometryError, PagingGeometry, SplitAddress};
pub use crate::mapper::{HhdmMapper, PhysMapper};
pub use crate::table::{Access, PageTable};
pub use crate::translator::{Translation, TranslationError, translate, walk};
pub use crate::x86_64::{TableFrame, X86PageTables};
