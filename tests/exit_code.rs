use anyhow::Result;
use ntest::timeout;

use halts::{Command, ForkResult, StopReason, Tracer};

/// Trace a real exec'd command to its exit and recover the exit code
/// both from the exit syscall argument and from the final wait status.
#[test]
#[timeout(10000)]
fn exit_code_propagates() -> Result<()> {
    // Built before forking: the child role must not allocate.
    let cmd = Command::new(vec!["/bin/sh", "-c", "exit 42"])?;

    let mut tracer = Tracer::new();

    if let ForkResult::Child = tracer.fork()? {
        let err = cmd.exec();
        eprintln!("execvp() failed: {err}");
        unsafe { libc::_exit(127) };
    }

    let mut exit_argument = None;

    while tracer.resume_and_wait(StopReason::SyscallEntry, None)? {
        let name = tracer.syscall_name()?;

        if name == "exit_group" || name == "exit" {
            exit_argument = Some(tracer.syscall_argument(0)?);
            assert!(!tracer.resume_and_wait(StopReason::SyscallExit, None)?);
            break;
        }

        if !tracer.resume_and_wait(StopReason::SyscallExit, None)? {
            break;
        }
    }

    assert_eq!(exit_argument, Some(42));
    assert_eq!(tracer.stop_reason(), StopReason::Exited);
    assert!(libc::WIFEXITED(tracer.status()));
    assert_eq!(libc::WEXITSTATUS(tracer.status()), 42);

    Ok(())
}
