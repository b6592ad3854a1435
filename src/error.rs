use thiserror::Error;

/// Job-control errors reported to the user. None of them end the shell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("Tried to create too many jobs")]
    TableFull,
    #[error("{0} command requires PID or %jobid argument")]
    MissingArgument(String),
    #[error("{0}: argument must be a PID or %jobid")]
    InvalidJobSpec(String),
    #[error("%{0}: job does not exist")]
    NoSuchJob(usize),
    #[error("({0}): process does not exist")]
    NoSuchProcess(i32),
}
