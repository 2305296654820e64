use std::process::Command;

use anyhow::Result;
use ntest::timeout;

use halts::{Pid, Signal, StopReason, Tracer};

/// Attach to a running, unrelated process: the tracer synchronises on
/// the OS-delivered SIGSTOP, after which the tracee is observable and
/// drivable like a forked one.
#[test]
#[timeout(10000)]
fn attach_synchronises_on_setup_stop() -> Result<()> {
    let child = Command::new("sleep").arg("30").spawn()?;
    let pid = Pid::from_raw(child.id() as i32);

    let mut tracer = Tracer::new();
    tracer.attach(pid)?;

    assert_eq!(tracer.pid(), Some(pid));
    assert_eq!(tracer.stop_reason(), StopReason::Signaled);
    assert_eq!(libc::WSTOPSIG(tracer.status()), libc::SIGSTOP);

    // The attached tracee reaches a syscall boundary like any other.
    assert!(tracer.resume_and_wait(StopReason::SyscallEntry, None)?);
    assert!(tracer.in_syscall());

    // External cancellation: let the tracee run, kill it, and observe
    // the exit on the next wait.
    tracer.resume(StopReason::Exited)?;
    nix::sys::signal::kill(pid, Signal::SIGKILL)?;
    assert_eq!(tracer.wait()?, StopReason::Exited);
    assert!(libc::WIFSIGNALED(tracer.status()));

    // The tracer consumed the wait status, so the std handle must not
    // also reap it.
    let _ = child;

    Ok(())
}
