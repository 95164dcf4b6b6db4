//! # Simulated Physical Memory
//!
//! A tiny in-memory "RAM" plus an identity-style [`PhysMapper`], for tests
//! and host tooling that need real x86-64 tables without real hardware.
//!
//! Physical addresses are byte offsets into a vector of 4 KiB-aligned
//! frames. Frames are handed out by a bump cursor: no free list, no reuse.
//!
//! All access to the backing store goes through one raw base pointer, so
//! pointers handed out by [`PhysMapper::phys_to_ptr`] stay valid while the
//! builder methods keep writing.

use crate::x86_64::ENTRIES_PER_TABLE;
use crate::{PageEntryBits, PagingGeometry, PhysMapper};
use alloc::vec::Vec;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

const FRAME_SIZE: usize = 4096;

/// Errors from building tables in [`SimulatedMemory`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("out of simulated frames")]
    OutOfFrames,
    #[error("physical address {0} is outside simulated memory")]
    OutOfRange(PhysicalAddress),
    #[error("a huge-page entry blocks the 4 KiB chain at level {0}")]
    BlockedByHugePage(u8),
}

/// A 4 KiB-aligned raw frame.
#[repr(C, align(4096))]
struct Frame([u8; FRAME_SIZE]);

/// Simulated physical RAM with an x86-64 table builder.
pub struct SimulatedMemory {
    /// Keeps the allocation alive; never accessed directly.
    _frames: Vec<Frame>,
    base: *mut u8,
    len: usize,
    next_frame: usize,
    geometry: PagingGeometry,
}

impl SimulatedMemory {
    /// `n` zeroed frames, 4-level paging.
    #[must_use]
    pub fn with_frames(n: usize) -> Self {
        Self::with_frames_and_geometry(n, PagingGeometry::X86_64_4LEVEL)
    }

    /// `n` zeroed frames; [`map_4k`](Self::map_4k) builds `geometry.levels()` levels.
    #[must_use]
    pub fn with_frames_and_geometry(n: usize, geometry: PagingGeometry) -> Self {
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push(Frame([0; FRAME_SIZE]));
        }
        let base = frames.as_mut_ptr().cast::<u8>();
        Self {
            _frames: frames,
            base,
            len: n * FRAME_SIZE,
            next_frame: 0,
            geometry,
        }
    }

    /// Total bytes of simulated memory.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hand out the next zeroed frame.
    ///
    /// # Errors
    /// [`SimError::OutOfFrames`] once every frame is used.
    pub fn alloc_frame(&mut self) -> Result<PhysicalAddress, SimError> {
        let start = self.next_frame * FRAME_SIZE;
        if start + FRAME_SIZE > self.len {
            return Err(SimError::OutOfFrames);
        }
        self.next_frame += 1;
        Ok(PhysicalAddress::new(start as u64))
    }

    /// Allocate an empty root table.
    ///
    /// # Errors
    /// [`SimError::OutOfFrames`].
    pub fn new_root(&mut self) -> Result<PhysicalAddress, SimError> {
        self.alloc_frame()
    }

    /// Map one 4 KiB page `va → pa` below `root`, creating missing tables.
    ///
    /// The leaf is written as `leaf | pa` verbatim, so tests can plant any
    /// flag pattern (including a cleared present bit).
    ///
    /// # Errors
    /// - [`SimError::OutOfFrames`] if an intermediate table can't be allocated.
    /// - [`SimError::BlockedByHugePage`] if an existing link has `PS=1`.
    pub fn map_4k(
        &mut self,
        root: PhysicalAddress,
        va: VirtualAddress,
        pa: PhysicalAddress,
        leaf: PageEntryBits,
    ) -> Result<(), SimError> {
        let mut table = root;
        for level in (2..=self.geometry.levels()).rev() {
            let slot = Self::slot(table, self.geometry.index(va, level));
            let entry = PageEntryBits::from_bits(self.read_u64(slot));
            if entry.present() {
                if entry.large_page() {
                    return Err(SimError::BlockedByHugePage(level));
                }
                table = entry.physical_address();
            } else {
                let next = self.alloc_frame()?;
                let link = PageEntryBits::new_table_link().with_physical_address(next);
                self.write_u64(slot, link.into_bits());
                table = next;
            }
        }

        let slot = Self::slot(table, self.geometry.index(va, 1));
        self.write_u64(slot, leaf.with_physical_address(pa).into_bits());
        Ok(())
    }

    /// Physical address of the entry used for `va` at `level`, following
    /// the existing chain from `root`. `None` if a link above is missing.
    #[must_use]
    pub fn entry_slot(
        &self,
        root: PhysicalAddress,
        va: VirtualAddress,
        level: u8,
    ) -> Option<PhysicalAddress> {
        let mut table = root;
        for l in (level + 1..=self.geometry.levels()).rev() {
            let entry = PageEntryBits::from_bits(self.read_u64(Self::slot(table, self.geometry.index(va, l))));
            if !entry.present() {
                return None;
            }
            table = entry.physical_address();
        }
        Some(Self::slot(table, self.geometry.index(va, level)))
    }

    /// Read an 8-byte little-endian word.
    ///
    /// # Panics
    /// If `pa..pa+8` lies outside simulated memory.
    #[must_use]
    pub fn read_u64(&self, pa: PhysicalAddress) -> u64 {
        let mut buf = [0u8; 8];
        self.read_bytes(pa, &mut buf);
        u64::from_le_bytes(buf)
    }

    /// Write an 8-byte little-endian word.
    ///
    /// # Panics
    /// If `pa..pa+8` lies outside simulated memory.
    pub fn write_u64(&mut self, pa: PhysicalAddress, value: u64) {
        self.write_bytes(pa, &value.to_le_bytes());
    }

    /// # Panics
    /// If the range lies outside simulated memory.
    pub fn read_bytes(&self, pa: PhysicalAddress, dst: &mut [u8]) {
        let start = self.checked_range(pa, dst.len());
        // SAFETY: `checked_range` keeps the copy inside the allocation.
        unsafe { core::ptr::copy_nonoverlapping(self.base.add(start), dst.as_mut_ptr(), dst.len()) };
    }

    /// # Panics
    /// If the range lies outside simulated memory.
    pub fn write_bytes(&mut self, pa: PhysicalAddress, src: &[u8]) {
        let start = self.checked_range(pa, src.len());
        // SAFETY: `checked_range` keeps the copy inside the allocation.
        unsafe { core::ptr::copy_nonoverlapping(src.as_ptr(), self.base.add(start), src.len()) };
    }

    /// Copy of every byte of simulated memory.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = alloc::vec![0u8; self.len];
        self.read_bytes(PhysicalAddress::zero(), &mut out);
        out
    }

    #[allow(clippy::cast_possible_truncation)]
    fn checked_range(&self, pa: PhysicalAddress, len: usize) -> usize {
        let start = pa.as_u64() as usize;
        assert!(
            start.checked_add(len).is_some_and(|end| end <= self.len),
            "{}",
            SimError::OutOfRange(pa)
        );
        start
    }

    const fn slot(table: PhysicalAddress, index: usize) -> PhysicalAddress {
        debug_assert!(index < ENTRIES_PER_TABLE);
        PhysicalAddress::new(table.as_u64() + (index * 8) as u64)
    }
}

impl PhysMapper for SimulatedMemory {
    /// Pointer into the simulated RAM. Addresses outside it yield a null
    /// pointer; the caller must not dereference it.
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let start = pa.as_u64() as usize;
        match start.checked_add(size_of::<T>()) {
            Some(end) if end <= self.len => self.base.wrapping_add(start).cast::<T>(),
            _ => core::ptr::null_mut(),
        }
    }
}
