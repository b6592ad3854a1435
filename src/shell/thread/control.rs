use std::{
    ops::{Deref, DerefMut},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use nix::{
    errno::Errno,
    sys::{
        signal::Signal,
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};
use tracing::debug;

use super::{
    job::{JobId, JobState, JobTable},
    process::{send_signal, Target},
};
use crate::{error::JobError, shell::syscall};

/// The job table shared between the command loop and the signal thread.
///
/// Every read or write goes through one mutex. The reaper notifies `changed`
/// after each drain, which is what the foreground waiter sleeps on.
#[derive(Debug)]
pub struct JobControl {
    table: Mutex<JobTable>,
    changed: Condvar,
    verbose: bool,
}

/// Holds the job table lock. While it is alive the reaper cannot act on any
/// child state change, so a fork followed by `register` is atomic from the
/// reaper's point of view. Dropping it lets pending notifications through.
pub struct NotificationScope<'a> {
    table: MutexGuard<'a, JobTable>,
    verbose: bool,
}

impl NotificationScope<'_> {
    pub fn register(&mut self, pid: Pid, state: JobState, command: &str) -> Result<JobId, JobError> {
        let jid = self.table.insert(pid, state, command)?;
        debug!(%pid, %jid, ?state, live = self.table.len(), "job added");
        if self.verbose {
            println!("Added job [{}] {} {}", jid, pid, command);
        }
        Ok(jid)
    }
}

impl Deref for NotificationScope<'_> {
    type Target = JobTable;

    fn deref(&self) -> &JobTable {
        &self.table
    }
}

impl DerefMut for NotificationScope<'_> {
    fn deref_mut(&mut self) -> &mut JobTable {
        &mut self.table
    }
}

impl JobControl {
    pub fn new(verbose: bool) -> Self {
        Self::with_table(JobTable::new(), verbose)
    }

    pub fn with_table(table: JobTable, verbose: bool) -> Self {
        JobControl {
            table: Mutex::new(table),
            changed: Condvar::new(),
            verbose,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn defer_notifications(&self) -> NotificationScope<'_> {
        NotificationScope {
            table: self.lock(),
            verbose: self.verbose,
        }
    }

    /// Drains every pending child state change without blocking.
    pub fn reap(&self) -> nix::Result<()> {
        // WUNTRACED: Return if a child has stopped
        // WNOHANG: Return immediately if no child has changed state
        let flag = Some(WaitPidFlag::WUNTRACED | WaitPidFlag::WNOHANG);

        let mut table = self.lock();
        let result = loop {
            match syscall(|| wait::waitpid(Pid::from_raw(-1), flag)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break Ok(()),
                Ok(status) => self.record(&mut table, status),
                Err(e) => break Err(e),
            }
        };
        drop(table);
        self.changed.notify_all();
        result
    }

    /// Applies one wait status to the table.
    pub fn record(&self, table: &mut JobTable, status: WaitStatus) {
        match status {
            WaitStatus::Exited(pid, code) => {
                if let Some(job) = table.lookup_by_pid(pid) {
                    debug!(%pid, jid = %job.jid, code, "job exited");
                    if self.verbose {
                        println!("Deleted job [{}] {} {}", job.jid, pid, job.command);
                    }
                    table.remove(pid);
                } else {
                    debug!(%pid, code, "untracked child exited");
                }
            }
            WaitStatus::Signaled(pid, sig, _core) => {
                if let Some(job) = table.lookup_by_pid(pid) {
                    println!(
                        "Job [{}] ({}) terminated by signal {}",
                        job.jid, pid, sig as i32
                    );
                    if self.verbose {
                        println!("Deleted job [{}] {} {}", job.jid, pid, job.command);
                    }
                    table.remove(pid);
                } else {
                    debug!(%pid, ?sig, "untracked child killed");
                }
            }
            WaitStatus::Stopped(pid, sig) => {
                if let Some(job) = table.lookup_by_pid_mut(pid) {
                    job.state = JobState::Stopped;
                    debug!(%pid, jid = %job.jid, ?sig, "job stopped");
                    if self.verbose {
                        println!("Job [{}] ({}) stopped by signal {}", job.jid, pid, sig as i32);
                    }
                }
            }
            other => debug!(?other, "ignored wait status"),
        }
    }

    /// Forwards `sig` to the foreground job's process group, if there is one.
    pub fn relay(&self, sig: Signal) -> nix::Result<()> {
        let table = self.lock();
        let Some(pg_id) = table.foreground_pid() else {
            debug!(?sig, "no foreground job to signal");
            return Ok(());
        };
        debug!(%pg_id, ?sig, "relaying signal");
        match send_signal(Target::Group(pg_id), sig) {
            Err(Errno::ESRCH) => Ok(()),
            other => other,
        }
    }

    /// Blocks until `pid` no longer holds the foreground.
    pub fn wait_foreground(&self, pid: Pid) {
        let table = self.lock();
        let _table = self
            .changed
            .wait_while(table, |table| table.foreground_pid() == Some(pid))
            .unwrap_or_else(PoisonError::into_inner);
    }
}
