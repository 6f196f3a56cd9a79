//! Process spawning inside fresh namespaces.
//!
//! The child is created with `clone(2)` so that every requested namespace
//! exists from its first instruction. It then parks on a pipe until the
//! parent has written any user-namespace ID maps, privatizes mount
//! propagation, and re-executes the target program.

use std::path::Path;

use runlet_common::error::{Result, RunletError};
use runlet_core::namespace::NamespaceSet;
use runlet_core::namespace::user::IdMappings;

/// Exit status reported when the child fails before or at `execv(2)`.
pub const SETUP_FAILURE_STATUS: i32 = 127;

/// Handle to a child created by [`spawn_isolated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildProcess {
    pid: i32,
}

impl ChildProcess {
    /// Host-side PID of the child.
    #[must_use]
    pub const fn pid(&self) -> i32 {
        self.pid
    }
}

/// Clones a child into `namespaces` and executes `program` with `args`.
///
/// `args` are appended after `argv[0]`, which is `program` itself. The child
/// inherits stdin, stdout and stderr. When `mappings` is given, they are
/// written before the child is released from the synchronization pipe.
///
/// # Errors
///
/// Returns an error if the arguments contain NUL bytes, the pipe cannot be
/// created, `clone(2)` fails, or the ID maps cannot be written. In the last
/// case the child is killed and reaped before returning.
#[cfg(target_os = "linux")]
pub fn spawn_isolated(
    program: &Path,
    args: &[&std::ffi::OsStr],
    namespaces: NamespaceSet,
    mappings: Option<&IdMappings>,
) -> Result<ChildProcess> {
    use std::os::fd::AsRawFd;

    use nix::fcntl::OFlag;
    use nix::sched::clone;
    use nix::sys::signal::Signal;

    let program_c = to_cstring(program.as_os_str())?;
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(program_c.clone());
    for arg in args {
        argv.push(to_cstring(arg)?);
    }

    let (read_end, write_end) =
        nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(|e| RunletError::Namespace {
            message: format!("creating sync pipe failed: {e}"),
        })?;
    let read_fd = read_end.as_raw_fd();
    let write_fd = write_end.as_raw_fd();
    let privatize_mounts = namespaces.mount;

    let mut stack = vec![0u8; runlet_common::constants::CHILD_STACK_SIZE];
    let child_main = Box::new(|| {
        child_entry(read_fd, write_fd, privatize_mounts, &program_c, &argv)
    });

    // SAFETY: the child runs in its own copy of the address space (no
    // CLONE_VM) and only touches data prepared before the clone.
    let pid = unsafe {
        clone(
            child_main,
            &mut stack,
            namespaces.clone_flags(),
            Some(Signal::SIGCHLD as libc::c_int),
        )
    }
    .map_err(|e| RunletError::Namespace {
        message: format!("clone({namespaces}) failed: {e}"),
    })?;
    drop(read_end);
    tracing::debug!(pid = pid.as_raw(), namespaces = %namespaces, "cloned child");

    if let Some(mappings) = mappings {
        if let Err(e) = runlet_core::namespace::user::write_id_mappings(pid.as_raw(), mappings) {
            drop(write_end);
            let _ = nix::sys::signal::kill(pid, Signal::SIGKILL);
            let _ = nix::sys::wait::waitpid(pid, None);
            return Err(e);
        }
    }
    drop(write_end);

    Ok(ChildProcess { pid: pid.as_raw() })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn spawn_isolated(
    _program: &Path,
    _args: &[&std::ffi::OsStr],
    _namespaces: NamespaceSet,
    _mappings: Option<&IdMappings>,
) -> Result<ChildProcess> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Runs in the cloned child. Returns only on failure.
#[cfg(target_os = "linux")]
#[allow(clippy::print_stderr)]
fn child_entry(
    read_fd: std::os::fd::RawFd,
    write_fd: std::os::fd::RawFd,
    privatize_mounts: bool,
    program: &std::ffi::CString,
    argv: &[std::ffi::CString],
) -> isize {
    // SAFETY: both descriptors are this process's copies of the sync pipe.
    unsafe {
        let _ = libc::close(write_fd);
    }
    if let Err(e) = wait_for_release(read_fd) {
        eprintln!("runlet: waiting for parent failed: {e}");
        return SETUP_FAILURE_STATUS as isize;
    }

    if privatize_mounts {
        if let Err(e) = runlet_core::filesystem::mount::make_mounts_private() {
            eprintln!("runlet: {e}");
            return SETUP_FAILURE_STATUS as isize;
        }
    }

    match nix::unistd::execv(program, argv) {
        Ok(never) => match never {},
        Err(e) => {
            eprintln!("runlet: exec {} failed: {e}", program.to_string_lossy());
            SETUP_FAILURE_STATUS as isize
        }
    }
}

/// Blocks until every write end of the pipe is closed.
#[cfg(target_os = "linux")]
fn wait_for_release(read_fd: std::os::fd::RawFd) -> std::io::Result<()> {
    let mut byte = 0u8;
    loop {
        // SAFETY: `byte` is a valid one-byte buffer for the whole call.
        let n = unsafe { libc::read(read_fd, (&raw mut byte).cast(), 1) };
        match n {
            0 => return Ok(()),
            n if n > 0 => {}
            _ => {
                let err = std::io::Error::last_os_error();
                if err.kind() != std::io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
    }
}

/// Ignores SIGINT and SIGQUIT in the calling process.
///
/// Terminal interrupts then only reach the foreground child.
///
/// # Errors
///
/// Returns an error if a signal disposition cannot be changed.
#[cfg(target_os = "linux")]
pub fn ignore_interrupts() -> Result<()> {
    use nix::sys::signal::{SigHandler, Signal, signal};

    for sig in [Signal::SIGINT, Signal::SIGQUIT] {
        // SAFETY: SIG_IGN installs no handler code.
        let _ = unsafe { signal(sig, SigHandler::SigIgn) }.map_err(|e| RunletError::Namespace {
            message: format!("ignoring {sig} failed: {e}"),
        })?;
    }
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Never fails.
#[cfg(not(target_os = "linux"))]
pub const fn ignore_interrupts() -> Result<()> {
    Ok(())
}

/// Blocks until `child` terminates and returns its exit code.
///
/// A child killed by a signal reports `128 + signal`.
///
/// # Errors
///
/// Returns an error if `waitpid(2)` fails.
#[cfg(target_os = "linux")]
pub fn wait_for_exit(child: ChildProcess) -> Result<i32> {
    use nix::errno::Errno;
    use nix::sys::wait::waitpid;
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.pid);
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(code) = exit_code(status) {
                    return Ok(code);
                }
            }
            Err(Errno::EINTR) => {}
            Err(e) => {
                return Err(RunletError::Namespace {
                    message: format!("waitpid({pid}) failed: {e}"),
                });
            }
        }
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because no child can exist.
#[cfg(not(target_os = "linux"))]
pub fn wait_for_exit(_child: ChildProcess) -> Result<i32> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Maps a terminal wait status to a shell-style exit code.
#[cfg(target_os = "linux")]
fn exit_code(status: nix::sys::wait::WaitStatus) -> Option<i32> {
    use nix::sys::wait::WaitStatus;

    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
        _ => None,
    }
}

#[cfg(target_os = "linux")]
fn to_cstring(value: &std::ffi::OsStr) -> Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;

    std::ffi::CString::new(value.as_bytes()).map_err(|_| RunletError::Config {
        message: format!("argument contains a NUL byte: {}", value.to_string_lossy()),
    })
}
