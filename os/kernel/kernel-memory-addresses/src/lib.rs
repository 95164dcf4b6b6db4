//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for the raw addresses that flow through a
//! page-table walk.
//!
//! | Concept | Description |
//! |---------|-------------|
//! | [`MemoryAddress`] | A raw 64-bit address, either physical or virtual. |
//! | [`VirtualAddress`] | An address as seen by a process, subject to translation. |
//! | [`PhysicalAddress`] | A machine address, the result of a translation. |
//!
//! ## Page Sizes
//!
//! Translation granules are type-level markers implementing [`PageSize`],
//! used to derive a paging geometry at compile time:
//!
//! - [`Size4K`]: 4 KiB (x86-64, and the smallest `AArch64` granule)
//! - [`Size64K`]: 64 KiB granule
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0000_7F00_1234_5ABC);
//! assert!(va.is_lower_half());
//!
//! let pa = PhysicalAddress::new(0xABCD_D000) + (va.as_u64() & Size4K::OFFSET_MASK);
//! assert_eq!(pa.as_u64(), 0xABCD_DABC);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

mod memory_address;
mod page_size;
mod physical_address;
mod virtual_address;

pub use crate::memory_address::MemoryAddress;
pub use crate::page_size::{PageSize, Size4K, Size64K};
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::VirtualAddress;
