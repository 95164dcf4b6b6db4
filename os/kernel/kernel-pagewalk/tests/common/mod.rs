//! Fabricated page tables for walking without any x86-64 machinery.
//!
//! Entry format (deliberately not x86-64):
//!
//! | Bits   | Meaning |
//! |--------|---------|
//! | 0      | present |
//! | 1      | poisoned (malformed) |
//! | 2–11   | flag noise, must never reach a result |
//! | 12–63  | non-leaf: next table id · leaf: frame number |

#![allow(dead_code)]

use kernel_memory_addresses::PhysicalAddress;
use kernel_pagewalk::{Access, AddressSpace, PageTable, PagingGeometry};
use std::cell::RefCell;

pub const PRESENT: u64 = 1 << 0;
pub const POISON: u64 = 1 << 1;
pub const NOISE: u64 = 0b1111_1111_1100;

pub struct FakeTables {
    geometry: PagingGeometry,
    tables: Vec<Vec<u64>>,
    reads: RefCell<Vec<(usize, usize)>>,
}

impl FakeTables {
    pub fn new(geometry: PagingGeometry) -> Self {
        let mut t = Self {
            geometry,
            tables: Vec::new(),
            reads: RefCell::new(Vec::new()),
        };
        t.new_table();
        t
    }

    pub const ROOT: usize = 0;

    pub fn space(&self) -> AddressSpace<'_, Self> {
        AddressSpace::new(self, Self::ROOT)
    }

    pub fn new_table(&mut self) -> usize {
        self.tables
            .push(vec![0; self.geometry.entries_per_table()]);
        self.tables.len() - 1
    }

    pub fn set(&mut self, table: usize, index: usize, raw: u64) {
        self.tables[table][index] = raw;
    }

    pub fn get(&self, table: usize, index: usize) -> u64 {
        self.tables[table][index]
    }

    /// Build the whole chain for `va` and return the table id at every
    /// level, root first. The leaf gets `leaf_raw` verbatim.
    pub fn map(&mut self, va: u64, leaf_raw: u64) -> Vec<usize> {
        let va = kernel_memory_addresses::VirtualAddress::new(va);
        let mut chain = vec![Self::ROOT];
        let mut table = Self::ROOT;
        for level in (2..=self.geometry.levels()).rev() {
            let index = self.geometry.index(va, level);
            let e = self.tables[table][index];
            table = if e & PRESENT != 0 {
                (e >> 12) as usize
            } else {
                let next = self.new_table();
                self.tables[table][index] = ((next as u64) << 12) | PRESENT;
                next
            };
            chain.push(table);
        }
        let index = self.geometry.index(va, 1);
        self.tables[table][index] = leaf_raw;
        chain
    }

    pub fn reads(&self) -> Vec<(usize, usize)> {
        self.reads.borrow().clone()
    }

    pub fn reset_reads(&self) {
        self.reads.borrow_mut().clear();
    }

    pub fn snapshot(&self) -> Vec<Vec<u64>> {
        self.tables.clone()
    }
}

impl PageTable for FakeTables {
    type Entry = u64;
    type TableRef = usize;

    fn geometry(&self) -> PagingGeometry {
        self.geometry
    }

    fn entry_at(&self, table: usize, index: usize) -> u64 {
        self.reads.borrow_mut().push((table, index));
        self.tables[table][index]
    }

    fn is_valid_subtree(&self, entry: u64) -> bool {
        entry & PRESENT != 0 && entry & POISON == 0
    }

    fn next_table(&self, entry: u64) -> usize {
        (entry >> 12) as usize
    }

    fn is_present(&self, entry: u64) -> bool {
        entry & PRESENT != 0
    }

    /// Hands back the raw entry, flags included, to prove the walker masks.
    fn frame_base(&self, entry: u64) -> PhysicalAddress {
        PhysicalAddress::new(entry)
    }

    /// No access control in this format.
    fn access(&self, _entry: u64) -> Access {
        Access::USER_RW
    }
}
