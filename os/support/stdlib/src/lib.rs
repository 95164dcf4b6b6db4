//! # Kernel/Userland Shared Support
//!
//! - [`syscall_abi`]: system call numbers and result-code encoding, shared by
//!   the kernel dispatcher and the userland wrappers.
//! - [`syscall`]: userland wrappers that trap into the kernel (x86-64 only).

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(feature = "syscall"), forbid(unsafe_code))]
#![cfg_attr(feature = "syscall", allow(unsafe_code))]

#[cfg(all(feature = "syscall", target_arch = "x86_64"))]
pub mod syscall;

#[cfg(feature = "syscall-abi")]
pub mod syscall_abi;
