use halts::{ForkResult, Tracer};

/// Fork a tracee that runs `child` in the new process.
///
/// The closure runs post-fork, so it must stick to async-signal-safe
/// calls (raw `libc`, no allocation) and should end the process itself
/// with `libc::_exit`; a fallthrough exits 0. On return in the parent,
/// the tracee is stopped at its setup SIGSTOP.
#[allow(unused)]
pub fn fork_traced(tracer: &mut Tracer, child: impl FnOnce()) -> anyhow::Result<()> {
    match tracer.fork()? {
        ForkResult::Child => {
            child();
            unsafe { libc::_exit(0) }
        }
        ForkResult::Parent { .. } => Ok(()),
    }
}
