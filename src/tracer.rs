//! The tracer and its tracee state machine.
//!
//! A [`Tracer`] owns exactly one tracee. The tracee is populated by
//! [`fork`](Tracer::fork) or [`attach`](Tracer::attach), then driven
//! through `resume`/`wait` cycles until [`StopReason::Exited`] is
//! observed, which is terminal. Stops are classified with
//! [`StopReason::from_wait_status`]; the tracer owns the in-syscall bit
//! that disambiguates the two halves of a syscall-stop, and it owns the
//! register cache that makes repeated inspection of a stopped tracee
//! cheap.
//!
//! When fork events are traced, a [`StopReason::Forked`] observation
//! bootstraps a new child [`Tracer`] synchronously inside
//! [`wait`](Tracer::wait): by the time the parent's `Forked` return is
//! visible, the child tracer is already in the children list, stopped at
//! its setup signal.

use nix::sys::ptrace;
use nix::sys::signal;
use nix::unistd;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::stop::{Restart, StopReason};

#[cfg(target_arch = "aarch64")]
use crate::aarch64 as arch;

#[cfg(target_arch = "x86_64")]
use crate::x86_64 as arch;

pub use nix::unistd::{ForkResult, Pid};

/// POSIX signal.
pub use nix::sys::signal::Signal;

/// Register state of a tracee.
pub type Registers = arch::Registers;

/// Maximum number of positional syscall arguments on the current
/// architecture.
pub const MAX_SYSCALL_ARGS: usize = arch::MAX_SYSCALL_ARGS;

const UNKNOWN_SYSCALL: &str = "unknown";

/// Per-tracee record. The pid doubles as the initialization sentinel,
/// and the register cache doubles as its own validity flag.
struct Tracee {
    pid: Option<Pid>,
    stop_reason: StopReason,
    status: i32,
    in_syscall: bool,
    registers: Option<Registers>,
}

impl Tracee {
    fn new() -> Self {
        Self {
            pid: None,
            stop_reason: StopReason::NotStopped,
            status: 0,
            in_syscall: false,
            registers: None,
        }
    }

    fn with_pid(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            ..Self::new()
        }
    }
}

/// Tracer for a single Linux process.
///
/// Constructed empty; [`fork`](Self::fork) or [`attach`](Self::attach)
/// populates the tracee. Tracers observed to fork (with
/// [`set_trace_children`](Self::set_trace_children) enabled) accumulate
/// one child `Tracer` per fork, each independently usable.
pub struct Tracer {
    tracee: Tracee,
    children: Vec<Tracer>,
    trace_children: bool,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self {
            tracee: Tracee::new(),
            children: Vec::new(),
            trace_children: false,
        }
    }

    /// Trace fork, vfork and clone events of the tracee, delivering
    /// [`StopReason::Forked`] stops and auto-attaching the new children.
    ///
    /// Takes effect at the next [`fork`](Self::fork) or
    /// [`attach`](Self::attach); the kernel propagates the option to
    /// auto-attached children on its own.
    pub fn set_trace_children(&mut self, trace_children: bool) {
        self.trace_children = trace_children;
    }

    /// OS process id of the tracee, or `None` before `fork`/`attach`.
    pub fn pid(&self) -> Option<Pid> {
        self.tracee.pid
    }

    /// Why the tracee is currently stopped ([`StopReason::NotStopped`]
    /// while it runs).
    pub fn stop_reason(&self) -> StopReason {
        self.tracee.stop_reason
    }

    /// Raw status word of the last `wait` observation. Needed to extract
    /// the signal number of a [`StopReason::Signaled`] stop, or the exit
    /// code after [`StopReason::Exited`].
    pub fn status(&self) -> i32 {
        self.tracee.status
    }

    /// True between a syscall-entry and the matching syscall-exit stop.
    pub fn in_syscall(&self) -> bool {
        self.tracee.in_syscall
    }

    /// True while the cached register snapshot reflects the stopped
    /// tracee. Cleared by every resume and by failed register accesses.
    pub fn registers_valid(&self) -> bool {
        self.tracee.registers.is_some()
    }

    /// Child tracers spawned on observed fork events, in event order.
    pub fn children(&self) -> &[Tracer] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Tracer] {
        &mut self.children
    }

    fn require_pid(&self) -> Result<Pid> {
        self.tracee.pid.ok_or(Error::UninitializedTracee)
    }

    /// Fork execution into tracee and tracer.
    ///
    /// In the child role, enables tracing of itself, raises the setup
    /// `SIGSTOP` and returns [`ForkResult::Child`]; the caller should
    /// follow up with an `exec` (see [`Command`](crate::Command)) or run
    /// its tracee code directly. The tracer is not usable in the child.
    ///
    /// In the parent role, synchronises on the setup stop and sets
    /// tracing options; on return the tracee is stopped at its raised
    /// `SIGSTOP` with [`StopReason::Signaled`].
    pub fn fork(&mut self) -> Result<ForkResult> {
        if let Some(pid) = self.tracee.pid {
            return Err(Error::AlreadyAttached { pid });
        }

        // Everything in the child branch below must be async-signal-safe:
        // no allocation, no error conversion. Failures panic.
        match unsafe { unistd::fork() }? {
            ForkResult::Child => {
                if ptrace::traceme().is_err() {
                    panic!("unable to accept tracing in child");
                }

                if signal::raise(Signal::SIGSTOP).is_err() {
                    panic!("unable to raise SIGSTOP");
                }

                Ok(ForkResult::Child)
            }
            parent @ ForkResult::Parent { child } => {
                info!(pid = child.as_raw(), "forked tracee");

                self.tracee = Tracee::with_pid(child);
                self.await_setup_stop()?;
                self.set_options()?;

                Ok(parent)
            }
        }
    }

    /// Attach to a running process.
    ///
    /// The OS delivers a `SIGSTOP` to the attached process; this call
    /// synchronises on it, re-sending any other signals that arrive
    /// first (in their original order), then sets tracing options. On
    /// return the tracee is stopped with [`StopReason::Signaled`].
    pub fn attach(&mut self, pid: Pid) -> Result<()> {
        if let Some(pid) = self.tracee.pid {
            return Err(Error::AlreadyAttached { pid });
        }

        ptrace::attach(pid).map_err(|source| Error::AttachDenied { pid, source })?;

        info!(pid = pid.as_raw(), "attached to tracee");

        self.tracee = Tracee::with_pid(pid);
        self.await_setup_stop()?;
        self.set_options()?;

        Ok(())
    }

    fn set_options(&mut self) -> Result<()> {
        let pid = self.require_pid()?;

        let mut options = ptrace::Options::PTRACE_O_TRACESYSGOOD;
        if self.trace_children {
            options |= ptrace::Options::PTRACE_O_TRACEFORK
                | ptrace::Options::PTRACE_O_TRACEVFORK
                | ptrace::Options::PTRACE_O_TRACECLONE;
        }

        ptrace::setoptions(pid, options)?;

        Ok(())
    }

    /// Await the setup `SIGSTOP` raised on `fork` or delivered by the OS
    /// on `attach`.
    ///
    /// Other signals may be sent to the tracee concurrently, in which
    /// case it enters signal-delivery-stop with those signals first. The
    /// usual practice, followed here: swallow and queue them until the
    /// `SIGSTOP` is seen, then re-send them to the tracee in arrival
    /// order so nothing is lost.
    fn await_setup_stop(&mut self) -> Result<()> {
        let pid = self.require_pid()?;

        let mut queued: Vec<Signal> = Vec::new();

        self.tracee.stop_reason = StopReason::NotStopped;

        loop {
            let stop = self.wait()?;

            if stop != StopReason::Signaled {
                return Err(Error::UnexpectedStop {
                    pid,
                    status: self.tracee.status,
                });
            }

            let stopsig = libc::WSTOPSIG(self.tracee.status);
            if stopsig == Signal::SIGSTOP as i32 {
                break;
            }

            debug!(pid = pid.as_raw(), signal = stopsig, "queueing signal seen before setup stop");

            queued.push(Signal::try_from(stopsig)?);
            self.resume(StopReason::Signaled)?;
        }

        for sig in queued {
            debug!(pid = pid.as_raw(), ?sig, "re-sending queued signal");
            signal::kill(pid, sig)?;
        }

        // The tracee is left in its setup stop, ready for options.
        Ok(())
    }

    /// Let a stopped tracee run again, until (at the soonest) the given
    /// stop kind.
    ///
    /// `until` is a hint: the next [`wait`](Self::wait) may observe any
    /// stop that [subsumes](StopReason::subsumes) it. The register cache
    /// is invalidated before the tracee runs. A pending signal at a
    /// signal-delivery-stop is suppressed, not delivered.
    pub fn resume(&mut self, until: StopReason) -> Result<()> {
        let pid = self.require_pid()?;

        if self.tracee.stop_reason == StopReason::NotStopped {
            return Err(Error::NotStopped { pid });
        }

        let restart = match until.restart() {
            Some(restart) => restart,
            None => return Err(Error::InvalidResumeTarget { pid }),
        };

        self.tracee.registers = None;
        self.tracee.stop_reason = StopReason::NotStopped;

        match restart {
            Restart::Step => ptrace::step(pid, None)?,
            Restart::Continue => ptrace::cont(pid, None)?,
            Restart::Syscall => ptrace::syscall(pid, None)?,
        }

        Ok(())
    }

    /// Block until the running tracee stops, and classify the stop.
    ///
    /// The returned reason is not necessarily the one asked for in the
    /// previous [`resume`](Self::resume); check it, or let
    /// [`resume_and_wait`](Self::resume_and_wait) loop for you. On a
    /// [`StopReason::Forked`] observation the new child tracer is
    /// bootstrapped before this returns.
    pub fn wait(&mut self) -> Result<StopReason> {
        let pid = self.require_pid()?;

        if self.tracee.stop_reason != StopReason::NotStopped {
            return Err(Error::NotStopped { pid });
        }

        let mut status = 0i32;

        // Retry the blocking wait if a signal lands on the tracer itself.
        loop {
            let rc = unsafe { libc::waitpid(pid.as_raw(), &mut status, 0) };

            if rc == pid.as_raw() {
                break;
            }

            match nix::errno::Errno::last() {
                nix::errno::Errno::EINTR => continue,
                nix::errno::Errno::ECHILD => {
                    // The tracee is gone. That is only legitimate if we
                    // already saw it exit.
                    if self.tracee.stop_reason == StopReason::Exited {
                        return Ok(StopReason::Exited);
                    }
                    return Err(Error::GhostChild { pid });
                }
                source => return Err(Error::Wait { pid, source }),
            }
        }

        let reason = StopReason::from_wait_status(status, self.tracee.in_syscall);
        if reason == StopReason::NotStopped {
            return Err(Error::UnexpectedStop { pid, status });
        }

        debug!(pid = pid.as_raw(), ?reason, status, "tracee stopped");

        self.tracee.status = status;
        self.tracee.stop_reason = reason;

        match reason {
            StopReason::SyscallEntry | StopReason::SyscallExit => {
                self.tracee.in_syscall = !self.tracee.in_syscall;
            }
            StopReason::Forked => self.handle_fork()?,
            _ => {}
        }

        Ok(reason)
    }

    /// Bootstrap the tracer for a child spawned by the tracee. Called
    /// with the tracee stopped immediately after a fork/vfork/clone
    /// event.
    fn handle_fork(&mut self) -> Result<()> {
        let pid = self.require_pid()?;

        let event = ptrace::getevent(pid)?;
        let child_pid = Pid::from_raw(event as u32 as i32);

        info!(
            pid = pid.as_raw(),
            child = child_pid.as_raw(),
            "tracee forked, bootstrapping child tracer"
        );

        // The new process starts as a tracee of this process and will be
        // delivered a SIGSTOP; run the setup synchronisation on it so it
        // is observable (and already stopped) when our caller returns.
        let mut child = Tracer {
            tracee: Tracee::with_pid(child_pid),
            children: Vec::new(),
            trace_children: self.trace_children,
        };
        child.await_setup_stop()?;

        self.children.push(child);

        Ok(())
    }

    /// Resume the tracee repeatedly until it stops for `until`, or
    /// exits, or the intermediate-stop budget runs out. Returns `true`
    /// iff the tracee stopped for `until`.
    ///
    /// The comparison is equality, not subsumption: a caller waiting for
    /// [`StopReason::SyscallEntry`] loops straight past a `Forked` stop.
    /// `max_intermediate_stops` is the escape hatch; `None` means
    /// unbounded. The budget counts completed resume/wait rounds against
    /// `>=`, so a budget of `n` permits `n + 1` rounds; in particular
    /// `Some(0)` still performs one.
    pub fn resume_and_wait(
        &mut self,
        until: StopReason,
        max_intermediate_stops: impl Into<Option<u32>>,
    ) -> Result<bool> {
        let max_intermediate_stops = max_intermediate_stops.into();
        let mut stops = 0u32;

        loop {
            self.resume(until)?;
            self.wait()?;
            stops += 1;

            let reason = self.tracee.stop_reason;
            if reason == until || reason == StopReason::Exited {
                break;
            }

            match max_intermediate_stops {
                None => continue,
                Some(budget) if budget >= stops => continue,
                Some(_) => break,
            }
        }

        Ok(self.tracee.stop_reason == until)
    }

    /// Register snapshot of the stopped tracee.
    ///
    /// Served from the cache when valid; otherwise one register-file
    /// read is issued and cached until the next resume.
    pub fn registers(&mut self) -> Result<Registers> {
        let pid = self.require_pid()?;

        if self.tracee.stop_reason == StopReason::NotStopped {
            return Err(Error::NotStopped { pid });
        }

        if let Some(regs) = self.tracee.registers {
            return Ok(regs);
        }

        let regs = arch::read_register_file(pid)
            .map_err(|source| Error::RegisterAccess { pid, source })?;
        self.tracee.registers = Some(regs);

        Ok(regs)
    }

    /// Write the full register file, updating the cache on success.
    pub fn set_registers(&mut self, regs: Registers) -> Result<()> {
        let pid = self.require_pid()?;

        if self.tracee.stop_reason == StopReason::NotStopped {
            return Err(Error::NotStopped { pid });
        }

        if let Err(source) = arch::write_register_file(pid, &regs) {
            self.tracee.registers = None;
            return Err(Error::RegisterAccess { pid, source });
        }

        self.tracee.registers = Some(regs);

        Ok(())
    }

    /// The tracee's current syscall number. Meaningful at a
    /// [`StopReason::SyscallEntry`] stop.
    pub fn syscall_number(&mut self) -> Result<i64> {
        let pid = self.require_pid()?;
        let regs = self.registers()?;

        arch::syscall_number(pid, &regs).map_err(|source| Error::RegisterAccess { pid, source })
    }

    /// Redirect the tracee to a different syscall number.
    ///
    /// On some architectures the number lives outside the general
    /// register file; the architecture layer owns that asymmetry.
    pub fn set_syscall_number(&mut self, number: i64) -> Result<()> {
        let pid = self.require_pid()?;
        let mut regs = self.registers()?;

        if let Err(source) = arch::write_syscall_number(pid, &mut regs, number) {
            self.tracee.registers = None;
            return Err(Error::RegisterAccess { pid, source });
        }

        self.tracee.registers = Some(regs);

        Ok(())
    }

    /// Positional syscall argument `index`, for
    /// `0 <= index < MAX_SYSCALL_ARGS`.
    pub fn syscall_argument(&mut self, index: usize) -> Result<i64> {
        let regs = self.registers()?;

        arch::syscall_argument(&regs, index)
    }

    pub fn set_syscall_argument(&mut self, index: usize, value: i64) -> Result<()> {
        let mut regs = self.registers()?;

        arch::set_syscall_argument(&mut regs, index, value)?;

        self.set_registers(regs)
    }

    /// Syscall return value. Meaningful at a
    /// [`StopReason::SyscallExit`] stop.
    pub fn syscall_return_value(&mut self) -> Result<i64> {
        let regs = self.registers()?;

        Ok(arch::syscall_return_value(&regs))
    }

    pub fn set_syscall_return_value(&mut self, value: i64) -> Result<()> {
        let mut regs = self.registers()?;

        arch::set_syscall_return_value(&mut regs, value);

        self.set_registers(regs)
    }

    /// Symbolic name for the given syscall number, or `None` when the
    /// number is out of range or has no entry, letting the caller pick
    /// the fallback.
    pub fn syscall_name_by_number(number: i64) -> Option<&'static str> {
        if !(0..=arch::MAX_SYSCALL_NUMBER).contains(&number) {
            return None;
        }

        arch::SYSCALL_NAMES.get(number as usize).copied().flatten()
    }

    /// Symbolic name of the currently executing syscall, `"unknown"` for
    /// numbers without one.
    pub fn syscall_name(&mut self) -> Result<&'static str> {
        let number = self.syscall_number()?;

        Ok(Self::syscall_name_by_number(number).unwrap_or(UNKNOWN_SYSCALL))
    }

    /// Read one machine word from the tracee's address space.
    pub fn read_word(&mut self, addr: u64) -> Result<i64> {
        let pid = self.require_pid()?;

        ptrace::read(pid, addr as ptrace::AddressType)
            .map_err(|source| Error::MemoryAccess { pid, addr, source })
    }

    /// Write one machine word into the tracee's address space.
    pub fn write_word(&mut self, addr: u64, value: i64) -> Result<()> {
        let pid = self.require_pid()?;

        ptrace::write(pid, addr as ptrace::AddressType, value as libc::c_long)
            .map_err(|source| Error::MemoryAccess { pid, addr, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tracer_is_unpopulated() {
        let tracer = Tracer::new();

        assert_eq!(tracer.pid(), None);
        assert_eq!(tracer.stop_reason(), StopReason::NotStopped);
        assert!(!tracer.in_syscall());
        assert!(!tracer.registers_valid());
        assert!(tracer.children().is_empty());
    }

    #[test]
    fn syscall_name_lookup_bounds() {
        assert_eq!(Tracer::syscall_name_by_number(-1), None);
        assert_eq!(
            Tracer::syscall_name_by_number(arch::MAX_SYSCALL_NUMBER + 1),
            None,
        );
        assert_eq!(
            Tracer::syscall_name_by_number(libc::SYS_write),
            Some("write"),
        );
        assert_eq!(
            Tracer::syscall_name_by_number(libc::SYS_exit_group),
            Some("exit_group"),
        );
    }
}
