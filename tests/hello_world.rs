use anyhow::Result;
use ntest::timeout;
use pretty_assertions::assert_eq;

use halts::{StopReason, Tracer};

mod support;
use support::fork_traced;

/// The canonical sequencing scenario: a tracee that writes
/// `Hello, World!` and exits 1 is observed as alternating
/// syscall-entry/exit pairs, with a `write` of length 13 from a readable
/// buffer and a final `exit_group(1)` that never returns.
#[test]
#[timeout(10000)]
fn hello_world_sequencing() -> Result<()> {
    let mut tracer = Tracer::new();

    fork_traced(&mut tracer, || {
        let message = b"Hello, World!";
        unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                message.as_ptr() as *const libc::c_void,
                message.len(),
            );
            libc::_exit(1);
        }
    })?;

    let mut saw_write = false;

    loop {
        assert!(
            tracer.resume_and_wait(StopReason::SyscallEntry, None)?,
            "tracee exited before its exit syscall was observed"
        );
        assert_eq!(tracer.stop_reason(), StopReason::SyscallEntry);
        assert!(tracer.in_syscall());

        let name = tracer.syscall_name()?;
        eprintln!("entry: {name}");

        if name == "write" && tracer.syscall_argument(0)? == libc::STDOUT_FILENO as i64 {
            let addr = tracer.syscall_argument(1)? as u64;
            assert_eq!(tracer.syscall_argument(2)?, 13);

            // The buffer argument points into the tracee's address
            // space; the first word of it reads back as expected.
            let word = tracer.read_word(addr)?;
            assert_eq!(&word.to_ne_bytes(), b"Hello, W");

            saw_write = true;
        }

        if name == "exit_group" || name == "exit" {
            assert_eq!(tracer.syscall_argument(0)?, 1);

            // The exit never completes: no syscall-exit stop follows.
            assert!(!tracer.resume_and_wait(StopReason::SyscallExit, None)?);
            assert_eq!(tracer.stop_reason(), StopReason::Exited);
            break;
        }

        assert!(
            tracer.resume_and_wait(StopReason::SyscallExit, None)?,
            "syscall {name} never completed"
        );
        assert_eq!(tracer.stop_reason(), StopReason::SyscallExit);
        assert!(!tracer.in_syscall());
    }

    assert!(saw_write);
    assert!(libc::WIFEXITED(tracer.status()));
    assert_eq!(libc::WEXITSTATUS(tracer.status()), 1);

    Ok(())
}
