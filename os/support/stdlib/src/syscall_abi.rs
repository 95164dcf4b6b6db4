//! System call numbers and the return-value convention.
//!
//! A call returns its result in `rax` as a `u64`:
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `0`   | success |
//! | `-errno` (two's complement) | failure |
//! | `u64::MAX` | unknown system call |

/// System call numbers, passed in `rax`.
#[repr(u64)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sysno {
    /// Translate a virtual address of the calling process into the physical
    /// address backing it.
    ///
    /// - `rdi`: pointer to a `u64` holding the virtual address.
    /// - `rsi`: pointer to a `u64` receiving the physical address.
    GetPhysicalAddress = 1,
}

impl Sysno {
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            1 => Some(Self::GetPhysicalAddress),
            _ => None,
        }
    }
}

/// Returned for a system call number the kernel does not know.
pub const ENOSYS_RETURN: u64 = u64::MAX;

/// Error numbers a system call may report.
#[repr(i64)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Errno {
    /// Bad address: caller memory could not be accessed, or the requested
    /// address has no physical backing.
    #[error("bad address (EFAULT)")]
    Fault = 14,
}

impl Errno {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    #[must_use]
    pub const fn from_raw(errno: i64) -> Option<Self> {
        match errno {
            14 => Some(Self::Fault),
            _ => None,
        }
    }

    /// Encode as a system call return value (`-errno`).
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn to_return(self) -> u64 {
        (-self.as_i64()) as u64
    }
}

/// Failure decoded from a system call return value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum SyscallFailure {
    #[error(transparent)]
    Errno(#[from] Errno),
    #[error("unknown system call")]
    NoSuchSyscall,
    #[error("unrecognised return value {0:#x}")]
    Unrecognised(u64),
}

/// Decode a raw return value of a call that yields no payload.
///
/// # Errors
/// The decoded [`SyscallFailure`] for any non-zero value.
#[allow(clippy::cast_possible_wrap)]
pub const fn decode_status(ret: u64) -> Result<(), SyscallFailure> {
    if ret == 0 {
        return Ok(());
    }
    if ret == ENOSYS_RETURN {
        return Err(SyscallFailure::NoSuchSyscall);
    }
    match Errno::from_raw((ret as i64).wrapping_neg()) {
        Some(e) => Err(SyscallFailure::Errno(e)),
        None => Err(SyscallFailure::Unrecognised(ret)),
    }
}
