use crate::tracer::Pid;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure surface of the tracer.
///
/// Every fallible operation returns one of these categories together with
/// the context needed to act on it (the tracee pid, the underlying OS
/// error, the offending address or index). Failures are surfaced
/// immediately; the only transparent retry in the library is the `EINTR`
/// loop inside [`Tracer::wait`](crate::Tracer::wait).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("illegal call with uninitialized tracee")]
    UninitializedTracee,

    #[error("tracer is already attached to tracee = {pid}")]
    AlreadyAttached { pid: Pid },

    #[error("could not attach to tracee = {pid}")]
    AttachDenied { pid: Pid, source: nix::Error },

    /// The tracee was running where a stopped tracee was required, or
    /// stopped where a running one was (`wait` on a stopped tracee).
    #[error("tracee = {pid} is not in the run state required by this call")]
    NotStopped { pid: Pid },

    #[error("cannot resume tracee = {pid} with a NOT_STOPPED target")]
    InvalidResumeTarget { pid: Pid },

    #[error("syscall argument index = {index} is out of range for this architecture")]
    ArgumentOutOfRange { index: usize },

    #[error("could not access registers of tracee = {pid}")]
    RegisterAccess { pid: Pid, source: nix::Error },

    #[error("could not access memory of tracee = {pid} at address = {addr:#x}")]
    MemoryAccess {
        pid: Pid,
        addr: u64,
        source: nix::Error,
    },

    /// A `wait(2)` status the library could not decode, or a stop other
    /// than the expected signal-delivery stop while synchronising on the
    /// setup SIGSTOP.
    #[error("unexpected stop of tracee = {pid} with wait status = {status:#x}")]
    UnexpectedStop { pid: Pid, status: i32 },

    /// `wait` reported that the tracee no longer exists, but its exit was
    /// never observed through this tracer.
    #[error("tracee = {pid} no longer exists, but no exit was observed")]
    GhostChild { pid: Pid },

    #[error("error waiting on tracee = {pid}")]
    Wait { pid: Pid, source: nix::Error },

    #[error("unexpected internal error")]
    Internal(#[from] nix::Error),
}
