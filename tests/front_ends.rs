use std::process::Command;

use anyhow::Result;
use ntest::timeout;

/// The strace front-end traces a command to completion and reports the
/// exit code it saw in the exit syscall.
#[test]
#[timeout(20000)]
fn strace_prints_exit_trailer() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_strace"))
        .args(["/bin/sh", "-c", "exit 42"])
        .output()?;

    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.trim_end().ends_with("+++ exited with 42 +++"),
        "stderr = {stderr}"
    );

    Ok(())
}

#[test]
#[timeout(10000)]
fn strace_usage_error_exits_nonzero() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_strace")).output()?;

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Usage:"), "stderr = {stderr}");

    Ok(())
}

/// The hello-world front-end sees its tracee's write and the tracee's
/// output lands on the shared stdout.
#[test]
#[timeout(20000)]
fn hello_world_traces_its_tracee() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_hello_world")).output()?;

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hello, World!"), "stdout = {stdout}");
    assert!(stdout.contains("write"), "stdout = {stdout}");
    assert!(
        stdout.contains("Tracee completed execution."),
        "stdout = {stdout}"
    );

    Ok(())
}
