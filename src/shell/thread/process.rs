use std::{ffi::CString, ptr};

use anyhow::Result;
use nix::{
    errno::Errno,
    libc,
    sys::signal::{self, Signal},
    unistd::{self, ForkResult, Pid},
};

use crate::shell::syscall;

/// Who receives a signal. A job's process group and its leader share an id,
/// so the distinction has to be explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Process(Pid),
    Group(Pid),
}

pub fn send_signal(target: Target, sig: Signal) -> nix::Result<()> {
    match target {
        Target::Process(pid) => signal::kill(pid, sig),
        Target::Group(pg_id) => signal::killpg(pg_id, sig),
    }
}

/// A command ready to run. The argument strings, the null-terminated `argv`
/// array and the failure message are all built before `fork`, so the child
/// only calls `setpgid`, `execvp`, `write` and `_exit`.
pub struct Program {
    args: Vec<CString>,
    // Points into `args`, whose heap buffers never move.
    argv: Vec<*const libc::c_char>,
    not_found: String,
}

impl Program {
    pub fn new(args: &[String]) -> Result<Self> {
        let args = args
            .iter()
            .map(|s| CString::new(s.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let filename = args
            .first()
            .ok_or_else(|| anyhow::anyhow!("empty command"))?;
        let not_found = format!("{}: Command not found\n", filename.to_string_lossy());
        let argv = args
            .iter()
            .map(|arg| arg.as_ptr())
            .chain([ptr::null()])
            .collect();
        Ok(Program {
            args,
            argv,
            not_found,
        })
    }

    /// Forks a child that becomes the leader of a new process group and
    /// replaces itself with the program. Returns the child's pid, which is
    /// also its process group id.
    pub fn fork_exec(&self) -> Result<Pid> {
        match syscall(|| unsafe { unistd::fork() })? {
            ForkResult::Parent { child } => {
                // Also done here so the group exists before anyone signals it.
                match unistd::setpgid(child, child) {
                    Ok(()) | Err(Errno::EACCES) | Err(Errno::ESRCH) => Ok(child),
                    Err(e) => Err(e.into()),
                }
            }
            ForkResult::Child => {
                let _ = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
                unsafe { libc::execvp(self.args[0].as_ptr(), self.argv.as_ptr()) };
                let _ = unistd::write(libc::STDOUT_FILENO, self.not_found.as_bytes());
                unsafe { libc::_exit(1) }
            }
        }
    }
}
