use crate::syscall_abi::{Sysno, SyscallFailure, decode_status};

/// Physical address backing `*vaddr` in the calling process.
///
/// `vaddr` holds the virtual address to translate (it need not point at
/// anything); the kernel reads it and writes the result into `paddr`.
///
/// # Errors
/// [`Errno::Fault`](crate::syscall_abi::Errno::Fault) if the kernel could
/// not access either location or the address is not mapped.
#[inline(always)]
#[allow(clippy::inline_always)]
pub fn get_physical_address(vaddr: &u64, paddr: &mut u64) -> Result<(), SyscallFailure> {
    let mut ret: u64;
    unsafe {
        core::arch::asm!(
            "syscall",
            inlateout("rax") Sysno::GetPhysicalAddress as u64 => ret,
            in("rdi") core::ptr::from_ref(vaddr),
            in("rsi") core::ptr::from_mut(paddr),
            lateout("rcx") _, // clobbered by SYSCALL
            lateout("r11") _, // clobbered by SYSCALL
            options(nostack)
        );
    }
    decode_status(ret)
}

/// Physical address of the byte `ptr` points at.
///
/// # Errors
/// See [`get_physical_address`].
#[inline]
pub fn physical_address_of<T>(ptr: *const T) -> Result<u64, SyscallFailure> {
    let vaddr = ptr as u64;
    let mut paddr = 0;
    get_physical_address(&vaddr, &mut paddr)?;
    Ok(paddr)
}
