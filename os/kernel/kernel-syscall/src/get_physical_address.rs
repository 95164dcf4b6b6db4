//! # `GetPhysicalAddress`
//!
//! The caller passes two pointers into its own memory: one to a `u64`
//! holding a virtual address, one to a `u64` that receives the physical
//! address backing it.
//!
//! The steps run strictly in order and each failure stops the request:
//!
//! 1. Read the virtual address from the caller. Failure: [`SyscallError::TransferFault`].
//! 2. Translate it in the caller's address space. Failure: [`SyscallError::Unmapped`].
//! 3. Write the physical address back. Failure: [`SyscallError::TransferFault`].
//!
//! Nothing is written to the caller unless step 2 succeeded.

use crate::caller::{CallerMemory, TransferFault, UserPtr};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_pagewalk::{AddressSpace, PageTable, TranslationError};
use log::{debug, trace};
use stdlib::syscall_abi::Errno;

/// Why a `GetPhysicalAddress` request failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyscallError {
    /// The request or result pointer could not be accessed.
    #[error("caller memory fault: {0}")]
    TransferFault(#[from] TransferFault),
    /// The requested address has no physical backing.
    #[error("requested address is not mapped")]
    Unmapped,
}

impl From<TranslationError> for SyscallError {
    fn from(e: TranslationError) -> Self {
        match e {
            TranslationError::Unmapped => Self::Unmapped,
        }
    }
}

impl SyscallError {
    /// Both failures report [`Errno::Fault`] to the caller.
    #[must_use]
    pub const fn errno(self) -> Errno {
        match self {
            Self::TransferFault(_) | Self::Unmapped => Errno::Fault,
        }
    }
}

/// Resolve the address at `vaddr_ptr` in `space` and store the result at
/// `paddr_out`.
///
/// # Errors
/// See [`SyscallError`].
pub fn get_physical_address<C, T>(
    caller: &C,
    space: &AddressSpace<'_, T>,
    vaddr_ptr: UserPtr<u64>,
    paddr_out: UserPtr<u64>,
) -> Result<PhysicalAddress, SyscallError>
where
    C: CallerMemory + ?Sized,
    T: PageTable + ?Sized,
{
    trace!("get_physical_address: vaddr_ptr={} paddr_out={}", vaddr_ptr.addr(), paddr_out.addr());
    let vaddr = caller.read_from_caller(vaddr_ptr).inspect_err(|e| {
        debug!("get_physical_address: cannot read request at {}: {e}", vaddr_ptr.addr());
    })?;
    let vaddr = VirtualAddress::new(vaddr);

    let paddr = space
        .translate(vaddr)
        .inspect_err(|_| debug!("get_physical_address: {vaddr} is not mapped"))?;

    caller.write_to_caller(paddr_out, paddr.as_u64()).inspect_err(|e| {
        debug!("get_physical_address: cannot write result to {}: {e}", paddr_out.addr());
    })?;

    trace!("get_physical_address: {vaddr} -> {paddr}");
    Ok(paddr)
}

/// [`get_physical_address`] with the result encoded as a return value:
/// `0` on success, `-EFAULT` on any failure.
#[must_use]
pub fn sys_get_physical_address<C, T>(
    caller: &C,
    space: &AddressSpace<'_, T>,
    vaddr_ptr: UserPtr<u64>,
    paddr_out: UserPtr<u64>,
) -> u64
where
    C: CallerMemory + ?Sized,
    T: PageTable + ?Sized,
{
    match get_physical_address(caller, space, vaddr_ptr, paddr_out) {
        Ok(_) => 0,
        Err(e) => e.errno().to_return(),
    }
}
