//! # Dispatch
//!
//! Routes a saved register frame to the handler named by `rax` and stores
//! the handler's result back into `rax`.
//!
//! Register use follows the `syscall` convention: number in `rax`,
//! arguments in `rdi`, `rsi`, `rdx`, `r10`, `r8`, `r9`.

use crate::caller::{CallerMemory, UserPtr};
use crate::get_physical_address::sys_get_physical_address;
use kernel_pagewalk::{AddressSpace, PageTable};
use log::warn;
use stdlib::syscall_abi::{ENOSYS_RETURN, Sysno};

/// General-purpose registers as saved by the entry stub.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SyscallFrame {
    pub rax: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub r10: u64,
    pub r8: u64,
    pub r9: u64,
}

impl SyscallFrame {
    /// Frame for `sysno` with the first two arguments set.
    #[must_use]
    pub const fn with_args(sysno: u64, arg0: u64, arg1: u64) -> Self {
        Self {
            rax: sysno,
            rdi: arg0,
            rsi: arg1,
            rdx: 0,
            r10: 0,
            r8: 0,
            r9: 0,
        }
    }
}

/// Everything a handler may touch on behalf of the calling process.
pub struct SyscallContext<'a, C: ?Sized, T: PageTable + ?Sized> {
    /// The caller's memory, for pointer arguments.
    pub caller: &'a C,
    /// The caller's address space, for translation requests.
    pub space: AddressSpace<'a, T>,
}

/// Run the call described by `frame` and write its result to `frame.rax`.
pub fn dispatch<C, T>(ctx: &SyscallContext<'_, C, T>, frame: &mut SyscallFrame)
where
    C: CallerMemory + ?Sized,
    T: PageTable + ?Sized,
{
    frame.rax = match Sysno::from_raw(frame.rax) {
        Some(Sysno::GetPhysicalAddress) => sys_get_physical_address(
            ctx.caller,
            &ctx.space,
            UserPtr::new(frame.rdi),
            UserPtr::new(frame.rsi),
        ),
        None => {
            warn!("unknown system call {:#x}", frame.rax);
            ENOSYS_RETURN
        }
    };
}
