//! The stop-reason vocabulary and its pure translations.
//!
//! Everything else in the crate speaks in terms of [`StopReason`]: `wait`
//! statuses are decoded into one, `resume` takes one as its target, and
//! the [`Restart`] primitive actually issued to the kernel is derived
//! from it. All three translations here are pure functions with no
//! failure modes.

/// Why a tracee is currently stopped, or what to resume it until.
///
/// The reasons form a strict partial order, the *subsumes* relation:
/// `a.subsumes(b)` means that a tracee stopped for `a` would also have
/// stopped had the tracer requested stops of kind `b`. Intuitively, `a`
/// is the shorter interval: a single instruction always completes before
/// the next syscall boundary, which completes before the next fork.
///
/// ```text
///  EXITED        FORKED
///    |             |
///    |   SYSCALL_ENTRY / SYSCALL_EXIT
///    |             |
///    |         SIGNALED
///    |             |
///    +--------- STEPPED
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopReason {
    /// The tracee has terminated, by normal exit or unhandled signal.
    Exited,

    /// Stopped immediately after spawning a child via fork, vfork or
    /// clone.
    Forked,

    /// Stopped at the boundary before the kernel executes a system call.
    SyscallEntry,

    /// Stopped after the kernel finished a system call, before control
    /// returns to user code.
    SyscallExit,

    /// Stopped with a signal pending delivery, visible to the tracer.
    Signaled,

    /// Executed exactly one instruction.
    ///
    /// Meaningful as a resume target; the resulting trap is observed as
    /// [`Signaled`](Self::Signaled), since the status word does not
    /// distinguish a completed step from any other trap.
    Stepped,

    /// Not stopped at all: running, or never started.
    NotStopped,
}

/// Resume primitives issued to the kernel to let a tracee run until its
/// next stop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Restart {
    Step,
    Continue,
    Syscall,
}

impl StopReason {
    /// Decode a raw `wait(2)` status word.
    ///
    /// Syscall-enter and syscall-exit stops are indistinguishable in the
    /// status itself; `in_syscall` is the externally-tracked bit that
    /// halves them. Returns [`StopReason::NotStopped`] for statuses the
    /// library does not understand, which callers must treat as a bug.
    pub fn from_wait_status(status: i32, in_syscall: bool) -> Self {
        if libc::WIFEXITED(status) || libc::WIFSIGNALED(status) {
            return StopReason::Exited;
        }

        if libc::WIFSTOPPED(status) {
            let stopsig = libc::WSTOPSIG(status);

            if stopsig == libc::SIGTRAP | 0x80 {
                // Syscall-stop, marked by PTRACE_O_TRACESYSGOOD. From the
                // manual: signal-delivery-stop never happens between
                // syscall-enter-stop and syscall-exit-stop, so the two
                // halves strictly alternate.
                return if in_syscall {
                    StopReason::SyscallExit
                } else {
                    StopReason::SyscallEntry
                };
            }

            if stopsig == libc::SIGTRAP {
                let event = (((status >> 8) & 0xffff) & !libc::SIGTRAP) >> 8;

                return match event {
                    // Nothing in the high byte: a plain trap.
                    0 => StopReason::Signaled,
                    libc::PTRACE_EVENT_FORK
                    | libc::PTRACE_EVENT_VFORK
                    | libc::PTRACE_EVENT_CLONE => StopReason::Forked,
                    _ => StopReason::NotStopped,
                };
            }

            return StopReason::Signaled;
        }

        StopReason::NotStopped
    }

    /// The weakest [`Restart`] primitive that is still guaranteed to
    /// catch a stop of this kind.
    ///
    /// The observed stop after resuming may differ: it will be one that
    /// [subsumes](Self::subsumes) the requested reason. Returns `None`
    /// for [`StopReason::NotStopped`], which is not a meaningful target.
    pub fn restart(self) -> Option<Restart> {
        match self {
            StopReason::Stepped => Some(Restart::Step),
            StopReason::SyscallEntry | StopReason::SyscallExit => Some(Restart::Syscall),
            StopReason::Signaled | StopReason::Exited | StopReason::Forked => {
                Some(Restart::Continue)
            }
            StopReason::NotStopped => None,
        }
    }

    /// The strict partial order described above: `a.subsumes(b)` iff a
    /// stop for `a` would also satisfy a request for `b`.
    ///
    /// [`SyscallEntry`](Self::SyscallEntry) and
    /// [`SyscallExit`](Self::SyscallExit) sit at the same level; neither
    /// subsumes the other. The relation is irreflexive.
    pub fn subsumes(self, other: Self) -> bool {
        use StopReason::*;

        match other {
            Exited => self == Stepped,
            Forked => matches!(self, SyscallEntry | SyscallExit | Signaled | Stepped),
            SyscallEntry | SyscallExit => matches!(self, Signaled | Stepped),
            Signaled => self == Stepped,
            Stepped | NotStopped => false,
        }
    }
}
