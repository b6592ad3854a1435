use std::sync::Arc;

use anyhow::Result;
use nix::{
    errno::Errno,
    sys::signal::Signal,
    unistd::Pid,
};
use tracing::debug;

use super::{
    control::JobControl,
    job::{JobId, JobState, JobTable},
    process::{send_signal, Program, Target},
};
use crate::{
    error::JobError,
    shell::parser::{parse_cmd, Cmd},
};

/// What the command loop does after a line has been evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A job named on the command line: `%jid` or a bare pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSpec {
    Jid(JobId),
    Pid(Pid),
}

impl JobSpec {
    pub fn parse(cmd: &str, arg: Option<&str>) -> Result<Self, JobError> {
        let arg = arg.ok_or_else(|| JobError::MissingArgument(cmd.to_string()))?;
        let invalid = || JobError::InvalidJobSpec(cmd.to_string());
        match arg.strip_prefix('%') {
            Some(jid) => match jid.parse::<JobId>() {
                Ok(jid) if usize::from(jid) > 0 => Ok(JobSpec::Jid(jid)),
                _ => Err(invalid()),
            },
            None => match arg.parse::<i32>() {
                Ok(n) if n > 0 => Ok(JobSpec::Pid(Pid::from_raw(n))),
                _ => Err(invalid()),
            },
        }
    }

    fn resolve(&self, table: &JobTable) -> Result<Pid, JobError> {
        match *self {
            JobSpec::Jid(jid) => table
                .lookup_by_jid(jid)
                .map(|job| job.pid)
                .ok_or_else(|| JobError::NoSuchJob(jid.into())),
            JobSpec::Pid(pid) => table
                .lookup_by_pid(pid)
                .map(|job| job.pid)
                .ok_or_else(|| JobError::NoSuchProcess(pid.as_raw())),
        }
    }
}

/// Evaluates command lines on the main thread: built-ins run in place,
/// anything else is launched as a job.
#[derive(Debug)]
pub struct Worker {
    control: Arc<JobControl>,
}

impl Worker {
    pub fn new(control: Arc<JobControl>) -> Self {
        Worker { control }
    }

    pub fn eval(&mut self, line: &str) -> Result<Flow> {
        let Some(cmd) = parse_cmd(line) else {
            return Ok(Flow::Continue);
        };
        let command = line.trim_end_matches(['\r', '\n']);
        if let Some(flow) = self.built_in_cmd(&cmd)? {
            return Ok(flow);
        }
        self.spawn_child(command, &cmd)?;
        Ok(Flow::Continue)
    }

    fn built_in_cmd(&mut self, cmd: &Cmd) -> Result<Option<Flow>> {
        let arg = cmd.args.get(1).map(String::as_str);
        let flow = match cmd.args[0].as_str() {
            "quit" => Flow::Quit,
            "jobs" => {
                self.run_jobs();
                Flow::Continue
            }
            "bg" => {
                self.run_bgfg("bg", JobState::Background, arg)?;
                Flow::Continue
            }
            "fg" => {
                self.run_bgfg("fg", JobState::Foreground, arg)?;
                Flow::Continue
            }
            _ => return Ok(None),
        };
        Ok(Some(flow))
    }

    fn run_jobs(&self) {
        let scope = self.control.defer_notifications();
        for job in scope.iter() {
            println!("[{}] ({}) {} {}", job.jid, job.pid, job.state, job.command);
        }
    }

    /// Resumes a job and moves it to `target`. Lookup errors are reported
    /// here; only OS failures are returned.
    fn run_bgfg(&mut self, name: &str, target: JobState, arg: Option<&str>) -> Result<()> {
        let spec = match JobSpec::parse(name, arg) {
            Ok(spec) => spec,
            Err(e) => {
                println!("{}", e);
                return Ok(());
            }
        };

        let pid = {
            let mut scope = self.control.defer_notifications();
            let pid = match spec.resolve(&scope) {
                Ok(pid) => pid,
                Err(e) => {
                    println!("{}", e);
                    return Ok(());
                }
            };
            match send_signal(Target::Group(pid), Signal::SIGCONT) {
                // Exited but not yet reaped; the reaper will drop it.
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => return Err(e.into()),
            }
            if let Some(job) = scope.lookup_by_pid_mut(pid) {
                job.state = target;
                debug!(%pid, jid = %job.jid, state = ?target, "job resumed");
                if target == JobState::Background {
                    println!("{}", job);
                }
            }
            pid
        };

        if target == JobState::Foreground {
            self.control.wait_foreground(pid);
        }
        Ok(())
    }

    fn spawn_child(&mut self, command: &str, cmd: &Cmd) -> Result<()> {
        let program = match Program::new(&cmd.args) {
            Ok(program) => program,
            Err(e) => {
                println!("{}: {}", cmd.args[0], e);
                return Ok(());
            }
        };
        let state = if cmd.background {
            JobState::Background
        } else {
            JobState::Foreground
        };

        let pid = {
            let mut scope = self.control.defer_notifications();
            let pid = program.fork_exec()?;
            match scope.register(pid, state, command) {
                Ok(jid) => {
                    if cmd.background {
                        println!("[{}] ({}) {}", jid, pid, command);
                    }
                    pid
                }
                Err(e) => {
                    // Never leave a child running that nothing tracks.
                    println!("{}", e);
                    send_signal(Target::Process(pid), Signal::SIGKILL)?;
                    return Ok(());
                }
            }
        };

        if !cmd.background {
            self.control.wait_foreground(pid);
        }
        Ok(())
    }
}
