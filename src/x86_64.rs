//! x86_64 register layout and syscall ABI.
//!
//! The syscall number is reported in `orig_rax` (the kernel clobbers
//! `rax` with the return value), arguments travel in `rdi`, `rsi`,
//! `rdx`, `r10`, `r8`, `r9`, and the return value comes back in `rax`.
//! See glibc `sysdeps/unix/sysv/linux/x86_64/syscall.S` for the
//! correspondence.

use nix::sys::ptrace;

use crate::error::{Error, Result};
use crate::tracer::Pid;

/// Register state of a tracee.
pub type Registers = libc::user_regs_struct;

/// Maximum number of positional arguments a system call takes on this
/// architecture.
pub const MAX_SYSCALL_ARGS: usize = 6;

pub(crate) fn read_register_file(pid: Pid) -> nix::Result<Registers> {
    ptrace::getregs(pid)
}

pub(crate) fn write_register_file(pid: Pid, regs: &Registers) -> nix::Result<()> {
    ptrace::setregs(pid, *regs)
}

pub(crate) fn syscall_number(_pid: Pid, regs: &Registers) -> nix::Result<i64> {
    Ok(regs.orig_rax as i64)
}

/// Stages the new number in the snapshot and writes the full register
/// file back. On this architecture the syscall number lives in the
/// ordinary register file, so the caller's snapshot stays in sync with
/// the kernel after a successful write.
pub(crate) fn write_syscall_number(pid: Pid, regs: &mut Registers, number: i64) -> nix::Result<()> {
    regs.orig_rax = number as u64;
    write_register_file(pid, regs)
}

pub(crate) fn syscall_argument(regs: &Registers, index: usize) -> Result<i64> {
    let value = match index {
        0 => regs.rdi,
        1 => regs.rsi,
        2 => regs.rdx,
        3 => regs.r10,
        4 => regs.r8,
        5 => regs.r9,
        _ => return Err(Error::ArgumentOutOfRange { index }),
    };

    Ok(value as i64)
}

pub(crate) fn set_syscall_argument(regs: &mut Registers, index: usize, value: i64) -> Result<()> {
    let slot = match index {
        0 => &mut regs.rdi,
        1 => &mut regs.rsi,
        2 => &mut regs.rdx,
        3 => &mut regs.r10,
        4 => &mut regs.r8,
        5 => &mut regs.r9,
        _ => return Err(Error::ArgumentOutOfRange { index }),
    };

    *slot = value as u64;

    Ok(())
}

pub(crate) fn syscall_return_value(regs: &Registers) -> i64 {
    regs.rax as i64
}

pub(crate) fn set_syscall_return_value(regs: &mut Registers, value: i64) {
    regs.rax = value as u64;
}

/// Highest syscall number with an entry in [`SYSCALL_NAMES`].
pub const MAX_SYSCALL_NUMBER: i64 = 334;

/// Symbolic names, indexed by syscall number. Holes are syscalls the
/// kernel reserves but does not implement on this architecture.
pub(crate) static SYSCALL_NAMES: &[Option<&str>] = &[
    Some("read"), Some("write"), Some("open"), Some("close"),
    Some("stat"), Some("fstat"), Some("lstat"), Some("poll"),
    Some("lseek"), Some("mmap"), Some("mprotect"), Some("munmap"),
    Some("brk"), Some("rt_sigaction"), Some("rt_sigprocmask"), Some("rt_sigreturn"),
    Some("ioctl"), Some("pread64"), Some("pwrite64"), Some("readv"),
    Some("writev"), Some("access"), Some("pipe"), Some("select"),
    Some("sched_yield"), Some("mremap"), Some("msync"), Some("mincore"),
    Some("madvise"), Some("shmget"), Some("shmat"), Some("shmctl"),
    Some("dup"), Some("dup2"), Some("pause"), Some("nanosleep"),
    Some("getitimer"), Some("alarm"), Some("setitimer"), Some("getpid"),
    Some("sendfile"), Some("socket"), Some("connect"), Some("accept"),
    Some("sendto"), Some("recvfrom"), Some("sendmsg"), Some("recvmsg"),
    Some("shutdown"), Some("bind"), Some("listen"), Some("getsockname"),
    Some("getpeername"), Some("socketpair"), Some("setsockopt"), Some("getsockopt"),
    Some("clone"), Some("fork"), Some("vfork"), Some("execve"),
    Some("exit"), Some("wait4"), Some("kill"), Some("uname"),
    Some("semget"), Some("semop"), Some("semctl"), Some("shmdt"),
    Some("msgget"), Some("msgsnd"), Some("msgrcv"), Some("msgctl"),
    Some("fcntl"), Some("flock"), Some("fsync"), Some("fdatasync"),
    Some("truncate"), Some("ftruncate"), Some("getdents"), Some("getcwd"),
    Some("chdir"), Some("fchdir"), Some("rename"), Some("mkdir"),
    Some("rmdir"), Some("creat"), Some("link"), Some("unlink"),
    Some("symlink"), Some("readlink"), Some("chmod"), Some("fchmod"),
    Some("chown"), Some("fchown"), Some("lchown"), Some("umask"),
    Some("gettimeofday"), Some("getrlimit"), Some("getrusage"), Some("sysinfo"),
    Some("times"), Some("ptrace"), Some("getuid"), Some("syslog"),
    Some("getgid"), Some("setuid"), Some("setgid"), Some("geteuid"),
    Some("getegid"), Some("setpgid"), Some("getppid"), Some("getpgrp"),
    Some("setsid"), Some("setreuid"), Some("setregid"), Some("getgroups"),
    Some("setgroups"), Some("setresuid"), Some("getresuid"), Some("setresgid"),
    Some("getresgid"), Some("getpgid"), Some("setfsuid"), Some("setfsgid"),
    Some("getsid"), Some("capget"), Some("capset"), Some("rt_sigpending"),
    Some("rt_sigtimedwait"), Some("rt_sigqueueinfo"), Some("rt_sigsuspend"), Some("sigaltstack"),
    Some("utime"), Some("mknod"), Some("uselib"), Some("personality"),
    Some("ustat"), Some("statfs"), Some("fstatfs"), Some("sysfs"),
    Some("getpriority"), Some("setpriority"), Some("sched_setparam"), Some("sched_getparam"),
    Some("sched_setscheduler"), Some("sched_getscheduler"), Some("sched_get_priority_max"), Some("sched_get_priority_min"),
    Some("sched_rr_get_interval"), Some("mlock"), Some("munlock"), Some("mlockall"),
    Some("munlockall"), Some("vhangup"), Some("modify_ldt"), Some("pivot_root"),
    Some("_sysctl"), Some("prctl"), Some("arch_prctl"), Some("adjtimex"),
    Some("setrlimit"), Some("chroot"), Some("sync"), Some("acct"),
    Some("settimeofday"), Some("mount"), Some("umount2"), Some("swapon"),
    Some("swapoff"), Some("reboot"), Some("sethostname"), Some("setdomainname"),
    Some("iopl"), Some("ioperm"), None, Some("init_module"),
    Some("delete_module"), None, None, Some("quotactl"),
    None, None, None, None,
    None, None, Some("gettid"), Some("readahead"),
    Some("setxattr"), Some("lsetxattr"), Some("fsetxattr"), Some("getxattr"),
    Some("lgetxattr"), Some("fgetxattr"), Some("listxattr"), Some("llistxattr"),
    Some("flistxattr"), Some("removexattr"), Some("lremovexattr"), Some("fremovexattr"),
    Some("tkill"), Some("time"), Some("futex"), Some("sched_setaffinity"),
    Some("sched_getaffinity"), Some("set_thread_area"), Some("io_setup"), Some("io_destroy"),
    Some("io_getevents"), Some("io_submit"), Some("io_cancel"), Some("get_thread_area"),
    Some("lookup_dcookie"), Some("epoll_create"), None, None,
    Some("remap_file_pages"), Some("getdents64"), Some("set_tid_address"), Some("restart_syscall"),
    Some("semtimedop"), Some("fadvise64"), Some("timer_create"), Some("timer_settime"),
    Some("timer_gettime"), Some("timer_getoverrun"), Some("timer_delete"), Some("clock_settime"),
    Some("clock_gettime"), Some("clock_getres"), Some("clock_nanosleep"), Some("exit_group"),
    Some("epoll_wait"), Some("epoll_ctl"), Some("tgkill"), Some("utimes"),
    None, Some("mbind"), Some("set_mempolicy"), Some("get_mempolicy"),
    Some("mq_open"), Some("mq_unlink"), Some("mq_timedsend"), Some("mq_timedreceive"),
    Some("mq_notify"), Some("mq_getsetattr"), Some("kexec_load"), Some("waitid"),
    Some("add_key"), Some("request_key"), Some("keyctl"), Some("ioprio_set"),
    Some("ioprio_get"), Some("inotify_init"), Some("inotify_add_watch"), Some("inotify_rm_watch"),
    Some("migrate_pages"), Some("openat"), Some("mkdirat"), Some("mknodat"),
    Some("fchownat"), Some("futimesat"), Some("newfstatat"), Some("unlinkat"),
    Some("renameat"), Some("linkat"), Some("symlinkat"), Some("readlinkat"),
    Some("fchmodat"), Some("faccessat"), Some("pselect6"), Some("ppoll"),
    Some("unshare"), Some("set_robust_list"), Some("get_robust_list"), Some("splice"),
    Some("tee"), Some("sync_file_range"), Some("vmsplice"), Some("move_pages"),
    Some("utimensat"), Some("epoll_pwait"), Some("signalfd"), Some("timerfd_create"),
    Some("eventfd"), Some("fallocate"), Some("timerfd_settime"), Some("timerfd_gettime"),
    Some("accept4"), Some("signalfd4"), Some("eventfd2"), Some("epoll_create1"),
    Some("dup3"), Some("pipe2"), Some("inotify_init1"), Some("preadv"),
    Some("pwritev"), Some("rt_tgsigqueueinfo"), Some("perf_event_open"), Some("recvmmsg"),
    Some("fanotify_init"), Some("fanotify_mark"), Some("prlimit64"), Some("name_to_handle_at"),
    Some("open_by_handle_at"), Some("clock_adjtime"), Some("syncfs"), Some("sendmmsg"),
    Some("setns"), Some("getcpu"), Some("process_vm_readv"), Some("process_vm_writev"),
    Some("kcmp"), Some("finit_module"), Some("sched_setattr"), Some("sched_getattr"),
    Some("renameat2"), Some("seccomp"), Some("getrandom"), Some("memfd_create"),
    Some("kexec_file_load"), Some("bpf"), Some("execveat"), Some("userfaultfd"),
    Some("membarrier"), Some("mlock2"), Some("copy_file_range"), Some("preadv2"),
    Some("pwritev2"), Some("pkey_mprotect"), Some("pkey_alloc"), Some("pkey_free"),
    Some("statx"), Some("io_pgetevents"), Some("rseq"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_dense_up_to_the_sentinel() {
        assert_eq!(SYSCALL_NAMES.len() as i64, MAX_SYSCALL_NUMBER + 1);
    }

    #[test]
    fn well_known_numbers() {
        assert_eq!(SYSCALL_NAMES[0], Some("read"));
        assert_eq!(SYSCALL_NAMES[1], Some("write"));
        assert_eq!(SYSCALL_NAMES[60], Some("exit"));
        assert_eq!(SYSCALL_NAMES[231], Some("exit_group"));
        assert_eq!(SYSCALL_NAMES[59], Some("execve"));
        assert_eq!(SYSCALL_NAMES[257], Some("openat"));
    }
}
