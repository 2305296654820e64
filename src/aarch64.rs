//! aarch64 register layout and syscall ABI.
//!
//! The general-purpose register file travels through the `NT_PRSTATUS`
//! regset. The syscall number is special: reads and writes go through
//! the dedicated `NT_ARM_SYSTEM_CALL` regset, because writing `x8` via
//! `NT_PRSTATUS` does not change the number the kernel dispatches on.
//! Arguments travel in `x0..x6` and the return value comes back in `x0`;
//! see glibc `sysdeps/unix/sysv/linux/aarch64/syscall.S`.

use std::mem::MaybeUninit;

use nix::errno::Errno;

use crate::error::{Error, Result};
use crate::tracer::Pid;

/// Defined in `include/uapi/linux/elf.h`.
const NT_PRSTATUS: i32 = 0x1;
const NT_ARM_SYSTEM_CALL: i32 = 0x404;

/// Defined in `arch/arm64/include/uapi/asm/ptrace.h`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
#[allow(non_camel_case_types)]
pub struct user_pt_regs {
    pub regs: [u64; 31],
    pub sp: u64,
    pub pc: u64,
    pub pstate: u64,
}

/// Register state of a tracee.
pub type Registers = user_pt_regs;

/// Maximum number of positional arguments a system call takes on this
/// architecture.
pub const MAX_SYSCALL_ARGS: usize = 7;

pub(crate) fn read_register_file(pid: Pid) -> nix::Result<Registers> {
    let mut data = MaybeUninit::<Registers>::uninit();
    let mut iov = libc::iovec {
        iov_base: data.as_mut_ptr() as *mut libc::c_void,
        iov_len: std::mem::size_of::<Registers>(),
    };

    let res = unsafe {
        libc::ptrace(
            libc::PTRACE_GETREGSET,
            pid.as_raw(),
            NT_PRSTATUS,
            &mut iov as *mut _ as *mut libc::c_void,
        )
    };

    Errno::result(res)?;

    Ok(unsafe { data.assume_init() })
}

pub(crate) fn write_register_file(pid: Pid, regs: &Registers) -> nix::Result<()> {
    let mut iov = libc::iovec {
        iov_base: regs as *const _ as *mut libc::c_void,
        iov_len: std::mem::size_of::<Registers>(),
    };

    let res = unsafe {
        libc::ptrace(
            libc::PTRACE_SETREGSET,
            pid.as_raw(),
            NT_PRSTATUS,
            &mut iov as *mut _ as *mut libc::c_void,
        )
    };

    Errno::result(res)?;

    Ok(())
}

/// The number comes from the dedicated regset, not the snapshot; `x8`
/// in the snapshot is only the convention the C library uses to load it.
pub(crate) fn syscall_number(pid: Pid, _regs: &Registers) -> nix::Result<i64> {
    let mut number: libc::c_int = 0;
    let mut iov = libc::iovec {
        iov_base: &mut number as *mut _ as *mut libc::c_void,
        iov_len: std::mem::size_of::<libc::c_int>(),
    };

    let res = unsafe {
        libc::ptrace(
            libc::PTRACE_GETREGSET,
            pid.as_raw(),
            NT_ARM_SYSTEM_CALL,
            &mut iov as *mut _ as *mut libc::c_void,
        )
    };

    Errno::result(res)?;

    Ok(number as i64)
}

/// Writes through `NT_ARM_SYSTEM_CALL` only. The snapshot is left
/// untouched: the general-purpose register file in the kernel has not
/// changed, so the caller's cache of it remains accurate.
pub(crate) fn write_syscall_number(pid: Pid, _regs: &mut Registers, number: i64) -> nix::Result<()> {
    let mut value = number as libc::c_int;
    let mut iov = libc::iovec {
        iov_base: &mut value as *mut _ as *mut libc::c_void,
        iov_len: std::mem::size_of::<libc::c_int>(),
    };

    let res = unsafe {
        libc::ptrace(
            libc::PTRACE_SETREGSET,
            pid.as_raw(),
            NT_ARM_SYSTEM_CALL,
            &mut iov as *mut _ as *mut libc::c_void,
        )
    };

    Errno::result(res)?;

    Ok(())
}

pub(crate) fn syscall_argument(regs: &Registers, index: usize) -> Result<i64> {
    if index >= MAX_SYSCALL_ARGS {
        return Err(Error::ArgumentOutOfRange { index });
    }

    Ok(regs.regs[index] as i64)
}

pub(crate) fn set_syscall_argument(regs: &mut Registers, index: usize, value: i64) -> Result<()> {
    if index >= MAX_SYSCALL_ARGS {
        return Err(Error::ArgumentOutOfRange { index });
    }

    regs.regs[index] = value as u64;

    Ok(())
}

pub(crate) fn syscall_return_value(regs: &Registers) -> i64 {
    regs.regs[0] as i64
}

pub(crate) fn set_syscall_return_value(regs: &mut Registers, value: i64) {
    regs.regs[0] = value as u64;
}

/// Highest syscall number with an entry in [`SYSCALL_NAMES`].
pub const MAX_SYSCALL_NUMBER: i64 = 293;

/// Symbolic names, indexed by syscall number. The hole at 244..=259 is
/// the range `asm-generic/unistd.h` reserves for per-architecture calls.
pub(crate) static SYSCALL_NAMES: &[Option<&str>] = &[
    Some("io_setup"), Some("io_destroy"), Some("io_submit"), Some("io_cancel"),
    Some("io_getevents"), Some("setxattr"), Some("lsetxattr"), Some("fsetxattr"),
    Some("getxattr"), Some("lgetxattr"), Some("fgetxattr"), Some("listxattr"),
    Some("llistxattr"), Some("flistxattr"), Some("removexattr"), Some("lremovexattr"),
    Some("fremovexattr"), Some("getcwd"), Some("lookup_dcookie"), Some("eventfd2"),
    Some("epoll_create1"), Some("epoll_ctl"), Some("epoll_pwait"), Some("dup"),
    Some("dup3"), Some("fcntl"), Some("inotify_init1"), Some("inotify_add_watch"),
    Some("inotify_rm_watch"), Some("ioctl"), Some("ioprio_set"), Some("ioprio_get"),
    Some("flock"), Some("mknodat"), Some("mkdirat"), Some("unlinkat"),
    Some("symlinkat"), Some("linkat"), Some("renameat"), Some("umount2"),
    Some("mount"), Some("pivot_root"), Some("nfsservctl"), Some("statfs"),
    Some("fstatfs"), Some("truncate"), Some("ftruncate"), Some("fallocate"),
    Some("faccessat"), Some("chdir"), Some("fchdir"), Some("chroot"),
    Some("fchmod"), Some("fchmodat"), Some("fchownat"), Some("fchown"),
    Some("openat"), Some("close"), Some("vhangup"), Some("pipe2"),
    Some("quotactl"), Some("getdents64"), Some("lseek"), Some("read"),
    Some("write"), Some("readv"), Some("writev"), Some("pread64"),
    Some("pwrite64"), Some("preadv"), Some("pwritev"), Some("sendfile"),
    Some("pselect6"), Some("ppoll"), Some("signalfd4"), Some("vmsplice"),
    Some("splice"), Some("tee"), Some("readlinkat"), Some("newfstatat"),
    Some("fstat"), Some("sync"), Some("fsync"), Some("fdatasync"),
    Some("sync_file_range"), Some("timerfd_create"), Some("timerfd_settime"), Some("timerfd_gettime"),
    Some("utimensat"), Some("acct"), Some("capget"), Some("capset"),
    Some("personality"), Some("exit"), Some("exit_group"), Some("waitid"),
    Some("set_tid_address"), Some("unshare"), Some("futex"), Some("set_robust_list"),
    Some("get_robust_list"), Some("nanosleep"), Some("getitimer"), Some("setitimer"),
    Some("kexec_load"), Some("init_module"), Some("delete_module"), Some("timer_create"),
    Some("timer_gettime"), Some("timer_getoverrun"), Some("timer_settime"), Some("timer_delete"),
    Some("clock_settime"), Some("clock_gettime"), Some("clock_getres"), Some("clock_nanosleep"),
    Some("syslog"), Some("ptrace"), Some("sched_setparam"), Some("sched_setscheduler"),
    Some("sched_getscheduler"), Some("sched_getparam"), Some("sched_setaffinity"), Some("sched_getaffinity"),
    Some("sched_yield"), Some("sched_get_priority_max"), Some("sched_get_priority_min"), Some("sched_rr_get_interval"),
    Some("restart_syscall"), Some("kill"), Some("tkill"), Some("tgkill"),
    Some("sigaltstack"), Some("rt_sigsuspend"), Some("rt_sigaction"), Some("rt_sigprocmask"),
    Some("rt_sigpending"), Some("rt_sigtimedwait"), Some("rt_sigqueueinfo"), Some("rt_sigreturn"),
    Some("setpriority"), Some("getpriority"), Some("reboot"), Some("setregid"),
    Some("setgid"), Some("setreuid"), Some("setuid"), Some("setresuid"),
    Some("getresuid"), Some("setresgid"), Some("getresgid"), Some("setfsuid"),
    Some("setfsgid"), Some("times"), Some("setpgid"), Some("getpgid"),
    Some("getsid"), Some("setsid"), Some("getgroups"), Some("setgroups"),
    Some("uname"), Some("sethostname"), Some("setdomainname"), Some("getrlimit"),
    Some("setrlimit"), Some("getrusage"), Some("umask"), Some("prctl"),
    Some("getcpu"), Some("gettimeofday"), Some("settimeofday"), Some("adjtimex"),
    Some("getpid"), Some("getppid"), Some("getuid"), Some("geteuid"),
    Some("getgid"), Some("getegid"), Some("gettid"), Some("sysinfo"),
    Some("mq_open"), Some("mq_unlink"), Some("mq_timedsend"), Some("mq_timedreceive"),
    Some("mq_notify"), Some("mq_getsetattr"), Some("msgget"), Some("msgctl"),
    Some("msgrcv"), Some("msgsnd"), Some("semget"), Some("semctl"),
    Some("semtimedop"), Some("semop"), Some("shmget"), Some("shmctl"),
    Some("shmat"), Some("shmdt"), Some("socket"), Some("socketpair"),
    Some("bind"), Some("listen"), Some("accept"), Some("connect"),
    Some("getsockname"), Some("getpeername"), Some("sendto"), Some("recvfrom"),
    Some("setsockopt"), Some("getsockopt"), Some("shutdown"), Some("sendmsg"),
    Some("recvmsg"), Some("readahead"), Some("brk"), Some("munmap"),
    Some("mremap"), Some("add_key"), Some("request_key"), Some("keyctl"),
    Some("clone"), Some("execve"), Some("mmap"), Some("fadvise64"),
    Some("swapon"), Some("swapoff"), Some("mprotect"), Some("msync"),
    Some("mlock"), Some("munlock"), Some("mlockall"), Some("munlockall"),
    Some("mincore"), Some("madvise"), Some("remap_file_pages"), Some("mbind"),
    Some("get_mempolicy"), Some("set_mempolicy"), Some("migrate_pages"), Some("move_pages"),
    Some("rt_tgsigqueueinfo"), Some("perf_event_open"), Some("accept4"), Some("recvmmsg"),
    None, None, None, None,
    None, None, None, None,
    None, None, None, None,
    None, None, None, None,
    Some("wait4"), Some("prlimit64"), Some("fanotify_init"), Some("fanotify_mark"),
    Some("name_to_handle_at"), Some("open_by_handle_at"), Some("clock_adjtime"), Some("syncfs"),
    Some("setns"), Some("sendmmsg"), Some("process_vm_readv"), Some("process_vm_writev"),
    Some("kcmp"), Some("finit_module"), Some("sched_setattr"), Some("sched_getattr"),
    Some("renameat2"), Some("seccomp"), Some("getrandom"), Some("memfd_create"),
    Some("bpf"), Some("execveat"), Some("userfaultfd"), Some("membarrier"),
    Some("mlock2"), Some("copy_file_range"), Some("preadv2"), Some("pwritev2"),
    Some("pkey_mprotect"), Some("pkey_alloc"), Some("pkey_free"), Some("statx"),
    Some("io_pgetevents"), Some("rseq"),
];
