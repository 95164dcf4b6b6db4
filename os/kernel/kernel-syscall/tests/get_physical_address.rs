use core::cell::Cell;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_pagewalk::sim::SimulatedMemory;
use kernel_pagewalk::{Access, AddressSpace, PageEntryBits, PageTable, PagingGeometry, TableFrame, X86PageTables};
use kernel_syscall::{
    ENOSYS_RETURN, Errno, PagedCallerMemory, Sysno, SyscallContext, SyscallError, SyscallFrame, TransferFault,
    UserPtr, dispatch, get_physical_address, sys_get_physical_address,
};

const EFAULT: u64 = 0u64.wrapping_sub(14);

/// Request page: the caller keeps its arguments here.
const REQ: u64 = 0x0000_0000_0040_0000;
/// Result page.
const OUT: u64 = 0x0000_0000_0040_1000;
/// Mapped target the caller asks about.
const TARGET: u64 = 0x0000_7F00_1234_5ABC;
const TARGET_FRAME: u64 = 0x0000_0000_ABCD_D000;
/// Never mapped.
const HOLE: u64 = 0x0000_0000_0090_0000;

const SENTINEL: u64 = 0x5A5A_5A5A_5A5A_5A5A;

struct Process {
    ram: SimulatedMemory,
    root: PhysicalAddress,
    req: PhysicalAddress,
    out: PhysicalAddress,
}

impl Process {
    fn new() -> Self {
        let mut ram = SimulatedMemory::with_frames(32);
        let root = ram.new_root().unwrap();
        let req = ram.alloc_frame().unwrap();
        let out = ram.alloc_frame().unwrap();
        let rw = PageEntryBits::new_user_rw();
        ram.map_4k(root, VirtualAddress::new(REQ), req, rw).unwrap();
        ram.map_4k(root, VirtualAddress::new(OUT), out, rw).unwrap();
        ram.map_4k(
            root,
            VirtualAddress::new(TARGET),
            PhysicalAddress::new(TARGET_FRAME),
            PageEntryBits::new_user_ro_nx(),
        )
        .unwrap();
        ram.write_u64(out, SENTINEL);
        Self { ram, root, req, out }
    }

    fn ask_for(&mut self, va: u64) {
        self.ram.write_u64(self.req, va);
    }

    fn answer(&self) -> u64 {
        self.ram.read_u64(self.out)
    }
}

/// Forwards to the wrapped tables and counts entry reads.
struct Counting<T> {
    inner: T,
    reads: Cell<usize>,
}

impl<T: PageTable> PageTable for Counting<T> {
    type Entry = T::Entry;
    type TableRef = T::TableRef;

    fn geometry(&self) -> PagingGeometry {
        self.inner.geometry()
    }

    fn entry_at(&self, table: Self::TableRef, index: usize) -> Self::Entry {
        self.reads.set(self.reads.get() + 1);
        self.inner.entry_at(table, index)
    }

    fn is_valid_subtree(&self, entry: Self::Entry) -> bool {
        self.inner.is_valid_subtree(entry)
    }

    fn next_table(&self, entry: Self::Entry) -> Self::TableRef {
        self.inner.next_table(entry)
    }

    fn is_present(&self, entry: Self::Entry) -> bool {
        self.inner.is_present(entry)
    }

    fn frame_base(&self, entry: Self::Entry) -> PhysicalAddress {
        self.inner.frame_base(entry)
    }

    fn access(&self, entry: Self::Entry) -> Access {
        self.inner.access(entry)
    }
}

#[test]
fn resolves_mapped_address() {
    let mut p = Process::new();
    p.ask_for(TARGET);

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    let ret = sys_get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(OUT));
    assert_eq!(ret, 0);
    assert_eq!(p.answer(), 0x0000_0000_ABCD_DABC);
}

#[test]
fn unmapped_target_is_efault_and_writes_nothing() {
    let mut p = Process::new();
    p.ask_for(HOLE + 0x10);
    let before = p.ram.snapshot();

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    assert_eq!(
        get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(OUT)),
        Err(SyscallError::Unmapped)
    );
    assert_eq!(
        sys_get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(OUT)),
        EFAULT
    );
    assert_eq!(p.answer(), SENTINEL);
    assert_eq!(p.ram.snapshot(), before);
}

#[test]
fn kernel_half_target_is_just_unmapped() {
    let mut p = Process::new();
    p.ask_for(0xFFFF_8000_0000_0000);

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    assert_eq!(
        get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(OUT)),
        Err(SyscallError::Unmapped)
    );
}

#[test]
fn unreadable_request_never_reaches_the_tables() {
    let mut p = Process::new();
    p.ask_for(TARGET);

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let caller = PagedCallerMemory::new(tables.address_space(p.root), &p.ram);
    let counting = Counting {
        inner: X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap(),
        reads: Cell::new(0),
    };
    let space = AddressSpace::new(&counting, TableFrame::from_addr(p.root));

    for bad in [0, HOLE, 0xFFFF_FFFF_FFFF_FFF8] {
        let ret = get_physical_address(&caller, &space, UserPtr::new(bad), UserPtr::new(OUT));
        assert!(matches!(ret, Err(SyscallError::TransferFault(_))), "{bad:#x}: {ret:?}");
    }
    assert_eq!(counting.reads.get(), 0);
    assert_eq!(p.answer(), SENTINEL);

    // The same tables do get walked once the request is readable.
    get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(OUT)).unwrap();
    assert_eq!(counting.reads.get(), 4);
}

#[test]
fn unwritable_result_is_efault() {
    let mut p = Process::new();
    p.ask_for(TARGET);
    let before = p.ram.snapshot();

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    assert_eq!(
        get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(HOLE)),
        Err(SyscallError::TransferFault(TransferFault::NotMapped(VirtualAddress::new(HOLE))))
    );
    // Straddles into the unmapped page after OUT.
    assert_eq!(
        sys_get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(OUT + 0xFFC)),
        EFAULT
    );
    assert_eq!(
        get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(0xFFFF_8000_0000_0000)),
        Err(SyscallError::TransferFault(TransferFault::OutsideUserSpace {
            start: VirtualAddress::new(0xFFFF_8000_0000_0000),
            len: 8,
        }))
    );
    assert_eq!(p.ram.snapshot(), before);
}

#[test]
fn write_to_read_only_page_is_efault() {
    const RO: u64 = 0x0000_0000_0040_3000;
    let mut p = Process::new();
    p.ask_for(TARGET);
    let ro = p.ram.alloc_frame().unwrap();
    p.ram
        .map_4k(p.root, VirtualAddress::new(RO), ro, PageEntryBits::new_user_ro_nx())
        .unwrap();
    p.ram.write_u64(ro, 0x1111_2222_3333_4444);
    let before = p.ram.snapshot();

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    assert_eq!(
        get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(RO)),
        Err(SyscallError::TransferFault(TransferFault::Protection(VirtualAddress::new(RO))))
    );
    assert_eq!(
        sys_get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(RO + 0x10)),
        EFAULT
    );
    assert_eq!(p.ram.read_u64(ro), 0x1111_2222_3333_4444);
    assert_eq!(p.ram.snapshot(), before);

    // A read-only page is still a valid request source.
    p.ram.write_u64(ro, TARGET);
    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);
    assert_eq!(
        sys_get_physical_address(&caller, &space, UserPtr::new(RO), UserPtr::new(OUT)),
        0
    );
    assert_eq!(p.answer(), 0x0000_0000_ABCD_DABC);
}

#[test]
fn request_on_supervisor_page_is_efault() {
    const KERNEL_ONLY: u64 = 0x0000_0000_0040_4000;
    let mut p = Process::new();
    p.ask_for(TARGET);
    let frame = p.ram.alloc_frame().unwrap();
    let supervisor_rw = PageEntryBits::new().with_present(true).with_writable(true);
    p.ram
        .map_4k(p.root, VirtualAddress::new(KERNEL_ONLY), frame, supervisor_rw)
        .unwrap();
    p.ram.write_u64(frame, TARGET);
    let before = p.ram.snapshot();

    let counting = Counting {
        inner: X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap(),
        reads: Cell::new(0),
    };
    let space = AddressSpace::new(&counting, TableFrame::from_addr(p.root));
    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let caller = PagedCallerMemory::new(tables.address_space(p.root), &p.ram);

    assert_eq!(
        get_physical_address(&caller, &space, UserPtr::new(KERNEL_ONLY), UserPtr::new(OUT)),
        Err(SyscallError::TransferFault(TransferFault::Protection(VirtualAddress::new(
            KERNEL_ONLY
        ))))
    );
    assert_eq!(
        sys_get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(KERNEL_ONLY)),
        EFAULT
    );
    // Only the second call got as far as translating.
    assert_eq!(counting.reads.get(), 4);
    assert_eq!(p.answer(), SENTINEL);
    assert_eq!(p.ram.snapshot(), before);
}

#[test]
fn request_may_straddle_pages() {
    let mut p = Process::new();
    // REQ and OUT are adjacent: the last 4 bytes of REQ and the first 4 of OUT.
    p.ram.write_bytes(p.req + 0xFFC, &TARGET.to_le_bytes()[..4]);
    p.ram.write_bytes(p.out, &TARGET.to_le_bytes()[4..]);

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    let ret = sys_get_physical_address(&caller, &space, UserPtr::new(REQ + 0xFFC), UserPtr::new(OUT + 0x100));
    assert_eq!(ret, 0);
    assert_eq!(p.ram.read_u64(p.out + 0x100), 0x0000_0000_ABCD_DABC);
}

#[test]
fn result_may_alias_request() {
    let mut p = Process::new();
    p.ask_for(TARGET);

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);

    assert_eq!(
        sys_get_physical_address(&caller, &space, UserPtr::new(REQ), UserPtr::new(REQ)),
        0
    );
    assert_eq!(p.ram.read_u64(p.req), 0x0000_0000_ABCD_DABC);
}

#[test]
fn dispatch_routes_by_number() {
    let mut p = Process::new();
    p.ask_for(TARGET);

    let tables = X86PageTables::new(&p.ram, PagingGeometry::X86_64_4LEVEL).unwrap();
    let space = tables.address_space(p.root);
    let caller = PagedCallerMemory::new(space, &p.ram);
    let ctx = SyscallContext { caller: &caller, space };

    let mut frame = SyscallFrame::with_args(Sysno::GetPhysicalAddress as u64, REQ, OUT);
    dispatch(&ctx, &mut frame);
    assert_eq!(frame.rax, 0);
    assert_eq!(p.answer(), 0x0000_0000_ABCD_DABC);

    let mut frame = SyscallFrame::with_args(Sysno::GetPhysicalAddress as u64, REQ, HOLE);
    dispatch(&ctx, &mut frame);
    assert_eq!(frame.rax, Errno::Fault.to_return());

    let mut frame = SyscallFrame::with_args(0xDEAD, REQ, OUT);
    dispatch(&ctx, &mut frame);
    assert_eq!(frame.rax, ENOSYS_RETURN);
}
