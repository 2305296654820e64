//! Minimal demonstration: trace a forked child through its system
//! calls, printing each name at entry and each return value at exit.

use halts::{ForkResult, StopReason, Tracer};

fn tracee_process() -> ! {
    // A single write() to stdout, which the tracer observes, then exit.
    let message = b"Hello, World!";

    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            message.as_ptr() as *const libc::c_void,
            message.len(),
        );
        libc::_exit(1);
    }
}

fn tracer_process(tracer: &mut Tracer) -> halts::Result<()> {
    // Resuming until SYSCALL_ENTRY steps over any other stop, such as a
    // signal delivery, and returns false once the tracee exits instead.
    while tracer.resume_and_wait(StopReason::SyscallEntry, None)? {
        println!("About to execute system call:");
        println!("{}", tracer.syscall_name()?);

        // Wait for the call to complete in kernel-space. The final
        // exit_group never returns.
        if !tracer.resume_and_wait(StopReason::SyscallExit, None)? {
            break;
        }

        println!("Return value:");
        println!("{}", tracer.syscall_return_value()?);
    }

    println!("Tracee completed execution.");

    Ok(())
}

fn main() {
    let mut tracer = Tracer::new();

    let run = match tracer.fork() {
        Ok(ForkResult::Child) => tracee_process(),
        Ok(ForkResult::Parent { .. }) => tracer_process(&mut tracer),
        Err(err) => Err(err),
    };

    if let Err(err) = run {
        eprintln!("Tracer error: {err}");
        std::process::exit(1);
    }
}
