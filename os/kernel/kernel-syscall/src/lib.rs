//! # Kernel System Calls
//!
//! The kernel side of the system call interface:
//!
//! - [`caller`]: moving values across the user/kernel boundary
//!   ([`CallerMemory`], [`PagedCallerMemory`]).
//! - [`get_physical_address`]: the `GetPhysicalAddress` request.
//! - [`dispatch`]: routing a decoded register frame to its handler.
//!
//! Numbers and return conventions are shared with userland through
//! `stdlib::syscall_abi`.

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code)]

pub mod caller;
pub mod dispatch;
pub mod get_physical_address;

pub use crate::caller::{CallerMemory, PagedCallerMemory, Plain, TransferFault, UserPtr};
pub use crate::dispatch::{SyscallContext, SyscallFrame, dispatch};
pub use crate::get_physical_address::{SyscallError, get_physical_address, sys_get_physical_address};
pub use stdlib::syscall_abi::{ENOSYS_RETURN, Errno, Sysno};
