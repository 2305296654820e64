use anyhow::Result;
use ntest::timeout;

use halts::{StopReason, Tracer};

mod support;
use support::fork_traced;

/// With fork tracing enabled, a fork in the tracee surfaces as a
/// `Forked` stop, and by the time `wait` returns the new child already
/// has its own tracer, stopped at its setup signal. Both tracees remain
/// independently drivable.
#[test]
#[timeout(10000)]
fn fork_events_bootstrap_child_tracers() -> Result<()> {
    let mut tracer = Tracer::new();
    tracer.set_trace_children(true);

    fork_traced(&mut tracer, || unsafe {
        let pid = libc::fork();
        if pid == 0 {
            libc::_exit(7);
        }
        libc::_exit(3);
    })?;

    assert!(tracer.resume_and_wait(StopReason::Forked, None)?);
    assert_eq!(tracer.stop_reason(), StopReason::Forked);
    assert_eq!(tracer.children().len(), 1);

    let child = &tracer.children()[0];
    assert_eq!(child.stop_reason(), StopReason::Signaled);
    assert_eq!(libc::WSTOPSIG(child.status()), libc::SIGSTOP);
    assert!(child.pid().is_some());
    assert_ne!(child.pid(), tracer.pid());

    // The child tracer runs its tracee to completion on its own.
    let child = &mut tracer.children_mut()[0];
    assert!(child.resume_and_wait(StopReason::Exited, None)?);
    assert!(libc::WIFEXITED(child.status()));
    assert_eq!(libc::WEXITSTATUS(child.status()), 7);

    // As does the parent.
    assert!(tracer.resume_and_wait(StopReason::Exited, None)?);
    assert!(libc::WIFEXITED(tracer.status()));
    assert_eq!(libc::WEXITSTATUS(tracer.status()), 3);

    Ok(())
}

/// Without the option, the same tracee forks silently: no `Forked` stop,
/// no child tracers.
#[test]
#[timeout(10000)]
fn forks_are_silent_by_default() -> Result<()> {
    let mut tracer = Tracer::new();

    fork_traced(&mut tracer, || unsafe {
        let pid = libc::fork();
        if pid == 0 {
            libc::_exit(0);
        }
        libc::_exit(0);
    })?;

    assert!(tracer.resume_and_wait(StopReason::Exited, None)?);
    assert!(tracer.children().is_empty());

    Ok(())
}
