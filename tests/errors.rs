use anyhow::Result;
use ntest::timeout;

use halts::{Error, Pid, StopReason, Tracer};

mod support;
use support::fork_traced;

#[test]
fn uninitialized_tracee_is_rejected() {
    let mut tracer = Tracer::new();

    assert!(matches!(
        tracer.resume(StopReason::Signaled),
        Err(Error::UninitializedTracee)
    ));
    assert!(matches!(tracer.wait(), Err(Error::UninitializedTracee)));
    assert!(matches!(tracer.registers(), Err(Error::UninitializedTracee)));
    assert!(matches!(
        tracer.syscall_number(),
        Err(Error::UninitializedTracee)
    ));
    assert!(matches!(
        tracer.read_word(0x1000),
        Err(Error::UninitializedTracee)
    ));
    assert!(matches!(
        tracer.write_word(0x1000, 0),
        Err(Error::UninitializedTracee)
    ));
}

#[test]
fn attach_to_nonexistent_process_is_denied() {
    let mut tracer = Tracer::new();

    // Far above any plausible pid_max.
    let err = tracer.attach(Pid::from_raw(0x7fff_fff0)).unwrap_err();
    assert!(matches!(err, Error::AttachDenied { .. }));

    // A failed attach leaves the tracer unpopulated.
    assert_eq!(tracer.pid(), None);
}

#[test]
#[timeout(10000)]
fn populated_tracer_rejects_fork_and_attach() -> Result<()> {
    let mut tracer = Tracer::new();
    fork_traced(&mut tracer, || unsafe { libc::_exit(0) })?;

    let pid = tracer.pid().unwrap();

    assert!(matches!(tracer.fork(), Err(Error::AlreadyAttached { .. })));
    assert!(matches!(
        tracer.attach(pid),
        Err(Error::AlreadyAttached { .. })
    ));

    assert!(tracer.resume_and_wait(StopReason::Exited, None)?);

    Ok(())
}

#[test]
#[timeout(10000)]
fn run_state_preconditions() -> Result<()> {
    let mut tracer = Tracer::new();
    fork_traced(&mut tracer, || unsafe { libc::_exit(0) })?;

    // Stopped at the setup SIGSTOP: waiting makes no sense...
    assert!(matches!(tracer.wait(), Err(Error::NotStopped { .. })));

    // ...nor does resuming "until NOT_STOPPED".
    assert!(matches!(
        tracer.resume(StopReason::NotStopped),
        Err(Error::InvalidResumeTarget { .. })
    ));

    // Once running, stop-only operations are rejected.
    tracer.resume(StopReason::Signaled)?;
    assert!(matches!(
        tracer.resume(StopReason::Signaled),
        Err(Error::NotStopped { .. })
    ));
    assert!(matches!(tracer.registers(), Err(Error::NotStopped { .. })));

    assert_eq!(tracer.wait()?, StopReason::Exited);

    // EXITED is terminal: the run state can no longer change.
    assert!(matches!(tracer.wait(), Err(Error::NotStopped { .. })));
    assert!(tracer.resume(StopReason::Signaled).is_err());

    Ok(())
}
