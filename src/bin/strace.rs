//! A miniature strace: run a command under the tracer and print one
//! `name(arg, arg, ...) = retval` line per system call on stderr.
//!
//! Real strace interprets far more argument types; this front-end
//! formats a small, useful subset (paths, buffers, pointers) and falls
//! back to decimal for the rest.

use std::env;
use std::process::exit;

use halts::{Command, ForkResult, StopReason, Tracer};

// Longest string read out of the tracee before cutting off with `...`.
const STRING_LIMIT: usize = 64;

fn main() {
    let argv: Vec<String> = env::args().skip(1).collect();

    if argv.is_empty() {
        let name = env::args().next().unwrap_or_else(|| "strace".into());
        eprintln!("Usage: {name} command [args...]");
        exit(1);
    }

    let cmd = match Command::new(argv) {
        Ok(cmd) => cmd,
        Err(err) => {
            eprintln!("Bad command: {err}");
            exit(1);
        }
    };

    let mut tracer = Tracer::new();

    match tracer.fork() {
        Ok(ForkResult::Child) => {
            let err = cmd.exec();
            eprintln!("execvp() failed: {err}");
            unsafe { libc::_exit(1) };
        }
        Ok(ForkResult::Parent { .. }) => {}
        Err(err) => {
            eprintln!("Tracer error: {err}");
            exit(1);
        }
    }

    if let Err(err) = trace(&mut tracer) {
        eprintln!("Tracer error: {err}");
        exit(1);
    }
}

fn trace(tracer: &mut Tracer) -> halts::Result<()> {
    let mut called_exit = false;
    let mut exit_code = 0i64;

    loop {
        if !tracer.resume_and_wait(StopReason::SyscallEntry, None)? {
            eprintln!("Program exited without calling exit()");
            break;
        }

        let number = tracer.syscall_number()?;
        if number == libc::SYS_exit || number == libc::SYS_exit_group {
            called_exit = true;
            exit_code = tracer.syscall_argument(0)?;
        }

        print_entry(tracer, number)?;

        if !tracer.resume_and_wait(StopReason::SyscallExit, None)? {
            if called_exit {
                eprintln!(" = ?");
                eprintln!("+++ exited with {exit_code} +++");
                break;
            }
            eprintln!("Program exited unexpectedly before completing system call.");
            break;
        }

        print_exit(tracer, number)?;
    }

    Ok(())
}

/// Documented argument count for the calls we format specially;
/// everything else shows the architecture maximum.
fn syscall_arg_count(number: i64) -> usize {
    match number {
        libc::SYS_brk | libc::SYS_close | libc::SYS_exit | libc::SYS_exit_group => 1,
        libc::SYS_read | libc::SYS_write | libc::SYS_fstat | libc::SYS_mprotect
        | libc::SYS_execve => 3,
        #[cfg(target_arch = "x86_64")]
        libc::SYS_open | libc::SYS_access | libc::SYS_stat => 3,
        libc::SYS_openat | libc::SYS_faccessat | libc::SYS_newfstatat => 4,
        libc::SYS_execveat => 5,
        libc::SYS_mmap => 6,
        _ => halts::MAX_SYSCALL_ARGS,
    }
}

fn print_entry(tracer: &mut Tracer, number: i64) -> halts::Result<()> {
    eprint!("{}(", tracer.syscall_name()?);

    for index in 0..syscall_arg_count(number) {
        if index > 0 {
            eprint!(", ");
        }
        print_argument(tracer, number, index)?;
    }

    eprint!(")");

    Ok(())
}

fn print_argument(tracer: &mut Tracer, number: i64, index: usize) -> halts::Result<()> {
    let value = tracer.syscall_argument(index)?;

    let formatted = match (number, index) {
        (libc::SYS_execve, 0) => format_string(tracer, value, STRING_LIMIT),
        #[cfg(target_arch = "x86_64")]
        (libc::SYS_open | libc::SYS_access | libc::SYS_stat, 0) => {
            format_string(tracer, value, STRING_LIMIT)
        }
        (
            libc::SYS_openat | libc::SYS_faccessat | libc::SYS_newfstatat | libc::SYS_execveat,
            1,
        ) => format_string(tracer, value, STRING_LIMIT),
        (libc::SYS_read | libc::SYS_write, 1) => {
            let count = tracer.syscall_argument(2)? as usize;
            format_string(tracer, value, count.min(STRING_LIMIT))
        }
        (libc::SYS_mmap | libc::SYS_brk | libc::SYS_mprotect, 0) | (libc::SYS_execve, 1) => {
            format_pointer(value)
        }
        _ => value.to_string(),
    };

    eprint!("{formatted}");

    Ok(())
}

fn print_exit(tracer: &mut Tracer, number: i64) -> halts::Result<()> {
    let value = tracer.syscall_return_value()?;

    match number {
        libc::SYS_brk | libc::SYS_mmap => eprintln!(" = {}", format_pointer(value)),
        _ => eprintln!(" = {value}"),
    }

    Ok(())
}

fn format_pointer(value: i64) -> String {
    if value == 0 {
        "NULL".into()
    } else {
        format!("0x{value:x}")
    }
}

/// Read a string out of the tracee one word at a time, stopping at a
/// NUL terminator or after `max_len` bytes. Unreadable memory degrades
/// to the plain pointer value.
fn format_string(tracer: &mut Tracer, addr: i64, max_len: usize) -> String {
    if addr == 0 {
        return "NULL".into();
    }

    let mut bytes = Vec::new();
    let mut terminated = false;

    'read: while bytes.len() < max_len {
        let word = match tracer.read_word(addr as u64 + bytes.len() as u64) {
            Ok(word) => word,
            Err(_) => return format_pointer(addr),
        };

        for byte in word.to_ne_bytes() {
            if byte == 0 {
                terminated = true;
                break 'read;
            }

            bytes.push(byte);

            if bytes.len() >= max_len {
                break 'read;
            }
        }
    }

    let escaped: String = bytes
        .iter()
        .flat_map(|byte| std::ascii::escape_default(*byte))
        .map(char::from)
        .collect();

    if terminated || bytes.len() < STRING_LIMIT {
        format!("\"{escaped}\"")
    } else {
        format!("\"{escaped}\"...")
    }
}
