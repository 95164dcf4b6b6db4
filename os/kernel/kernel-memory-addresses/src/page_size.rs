use core::fmt;
use core::hash::Hash;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported translation granules.
pub trait PageSize: sealed::Sealed + Copy + Eq + Hash + fmt::Debug {
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;
    /// Mask selecting the in-page offset bits.
    const OFFSET_MASK: u64 = Self::SIZE - 1;
}

macro_rules! page_size {
    ($(#[$meta:meta])* $name:ident, $shift:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl PageSize for $name {
            const SIZE: u64 = 1 << $shift;
            const SHIFT: u32 = $shift;
        }
    };
}

page_size!(
    /// 4 KiB page (4096 bytes).
    Size4K, 12
);

page_size!(
    /// 64 KiB page (`65_536` bytes).
    Size64K, 16
);
