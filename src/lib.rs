//! A small library for tracing Linux processes at their stop boundaries.
//!
//! The `ptrace(2)` interface reduces a tracee's life to a sequence of
//! stops: signal deliveries, the two halves of each system call, fork
//! events, single steps, and finally its exit. Interpreting those stops
//! requires context the kernel does not hand back. Most notably,
//! syscall-enter and syscall-exit stops are indistinguishable in the
//! wait status, and the initial `SIGSTOP` after an attach may be
//! preceded by unrelated pending signals.
//!
//! `halts` keeps that bookkeeping in one place. A [`Tracer`] owns a
//! single tracee and classifies every observed stop into a
//! [`StopReason`]; resuming takes the *desired* next stop and maps it to
//! the weakest ptrace request that is still guaranteed to catch it.
//! Fork events spawn fully-synchronised child tracers. Register and
//! memory access, syscall argument slots, and the syscall-name table are
//! unified behind one surface across architectures.
//!
//! ```no_run
//! use halts::{ForkResult, StopReason, Tracer};
//!
//! # fn main() -> halts::Result<()> {
//! let mut tracer = Tracer::new();
//!
//! if let ForkResult::Child = tracer.fork()? {
//!     // Tracee role: exec a program, or run code to be traced.
//!     unsafe { libc::_exit(0) };
//! }
//!
//! while tracer.resume_and_wait(StopReason::SyscallEntry, None)? {
//!     println!("about to execute: {}", tracer.syscall_name()?);
//!
//!     if !tracer.resume_and_wait(StopReason::SyscallExit, None)? {
//!         break; // the final exit_group never returns
//!     }
//!     println!("returned: {}", tracer.syscall_return_value()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod error;
pub mod stop;
pub mod tracer;

#[cfg(target_arch = "aarch64")]
pub mod aarch64;

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[doc(inline)]
pub use cmd::Command;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use stop::{Restart, StopReason};

#[doc(inline)]
pub use tracer::{ForkResult, Pid, Registers, Signal, Tracer, MAX_SYSCALL_ARGS};
