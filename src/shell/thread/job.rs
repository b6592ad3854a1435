use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use nix::unistd::Pid;

use crate::error::JobError;

/// Maximum number of live jobs.
pub const MAX_JOBS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(usize);

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse()?;
        Ok(JobId(id))
    }
}

impl From<JobId> for usize {
    fn from(id: JobId) -> usize {
        id.0
    }
}

impl From<usize> for JobId {
    fn from(id: usize) -> Self {
        JobId(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let label = match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid, // Also the process group id
    pub jid: JobId,
    pub state: JobState,
    pub command: String, // Command line as typed
}

impl Display for Job {
    /// `[jid] (pid) command`, the acknowledgment line for background jobs.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.jid, self.pid, self.command)
    }
}

/// Fixed-capacity table of live jobs.
///
/// Iteration order is ascending job id, which keeps `jobs` output stable.
#[derive(Debug)]
pub struct JobTable {
    jobs: BTreeMap<JobId, Job>,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_JOBS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        JobTable {
            jobs: BTreeMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Smallest positive job id not currently assigned, `None` when full.
    pub fn next_free_job_id(&self) -> Option<JobId> {
        (1..=self.capacity)
            .map(JobId)
            .find(|id| !self.jobs.contains_key(id))
    }

    pub fn insert(&mut self, pid: Pid, state: JobState, command: &str) -> Result<JobId, JobError> {
        let jid = self.next_free_job_id().ok_or(JobError::TableFull)?;
        debug_assert!(self.lookup_by_pid(pid).is_none());
        debug_assert!(state != JobState::Foreground || self.foreground_pid().is_none());
        self.jobs.insert(
            jid,
            Job {
                pid,
                jid,
                state,
                command: command.to_string(),
            },
        );
        Ok(jid)
    }

    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.lookup_by_pid(pid).map(|job| job.jid) {
            Some(jid) => self.jobs.remove(&jid).is_some(),
            None => false,
        }
    }

    pub fn lookup_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.jobs.values().find(|job| job.pid == pid)
    }

    pub fn lookup_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.jobs.values_mut().find(|job| job.pid == pid)
    }

    pub fn lookup_by_jid(&self, jid: JobId) -> Option<&Job> {
        self.jobs.get(&jid)
    }

    pub fn foreground_pid(&self) -> Option<Pid> {
        self.jobs
            .values()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn job_ids_start_at_one() {
        let mut table = JobTable::new();
        let jid = table.insert(pid(100), JobState::Background, "sleep 5 &").unwrap();
        assert_eq!(jid, JobId::from(1));
        assert_eq!(table.lookup_by_jid(jid).unwrap().pid, pid(100));
    }

    #[test]
    fn removed_job_id_is_reused_first() {
        let mut table = JobTable::new();
        for n in 1..=3 {
            table.insert(pid(100 + n), JobState::Background, "sleep 5 &").unwrap();
        }
        assert!(table.remove(pid(102)));
        assert_eq!(table.next_free_job_id(), Some(JobId::from(2)));
        let jid = table.insert(pid(200), JobState::Background, "sleep 1 &").unwrap();
        assert_eq!(jid, JobId::from(2));
        assert_eq!(table.next_free_job_id(), Some(JobId::from(4)));
    }

    #[test]
    fn full_table_rejects_insert_and_keeps_count() {
        let mut table = JobTable::new();
        for n in 0..MAX_JOBS as i32 {
            table.insert(pid(1000 + n), JobState::Background, "sleep 5 &").unwrap();
        }
        assert_eq!(table.next_free_job_id(), None);
        let err = table
            .insert(pid(5000), JobState::Background, "sleep 5 &")
            .unwrap_err();
        assert!(matches!(err, JobError::TableFull));
        assert_eq!(table.len(), MAX_JOBS);
        assert!(table.lookup_by_pid(pid(5000)).is_none());
    }

    #[test]
    fn remove_unknown_pid_is_false() {
        let mut table = JobTable::new();
        table.insert(pid(10), JobState::Stopped, "vi").unwrap();
        assert!(!table.remove(pid(11)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn foreground_pid_follows_state() {
        let mut table = JobTable::new();
        table.insert(pid(10), JobState::Background, "a &").unwrap();
        assert_eq!(table.foreground_pid(), None);
        table.insert(pid(11), JobState::Foreground, "b").unwrap();
        assert_eq!(table.foreground_pid(), Some(pid(11)));
        table.lookup_by_pid_mut(pid(11)).unwrap().state = JobState::Stopped;
        assert_eq!(table.foreground_pid(), None);
    }

    #[test]
    fn iteration_is_by_job_id() {
        let mut table = JobTable::new();
        for n in 1..=4 {
            table.insert(pid(n), JobState::Background, "x &").unwrap();
        }
        table.remove(pid(1));
        table.insert(pid(9), JobState::Background, "y &").unwrap();
        let order: Vec<_> = table.iter().map(|job| job.pid.as_raw()).collect();
        assert_eq!(order, vec![9, 2, 3, 4]);
    }

    #[rstest]
    #[case(JobState::Foreground, "Foreground")]
    #[case(JobState::Background, "Running")]
    #[case(JobState::Stopped, "Stopped")]
    fn state_labels(#[case] state: JobState, #[case] label: &str) {
        assert_eq!(state.to_string(), label);
    }

    #[rstest]
    #[case(&[1, 2, 3], &[2], 2)]
    #[case(&[1, 2, 3], &[1, 3], 1)]
    #[case(&[1, 2, 3, 4, 5], &[5, 4], 4)]
    #[case(&[], &[], 1)]
    fn next_free_is_smallest_unused(
        #[case] inserted: &[i32],
        #[case] removed: &[i32],
        #[case] expected: usize,
    ) {
        let mut table = JobTable::new();
        for &n in inserted {
            table.insert(pid(n), JobState::Background, "x &").unwrap();
        }
        for &n in removed {
            table.remove(pid(n));
        }
        assert_eq!(table.next_free_job_id(), Some(JobId::from(expected)));
    }

    #[test]
    fn ids_stay_unique_under_churn() {
        let mut table = JobTable::new();
        let mut next_pid = 1;
        for round in 0..64 {
            if round % 3 == 2 {
                let victim = table.iter().nth(round % table.len().max(1)).map(|job| job.pid);
                if let Some(victim) = victim {
                    table.remove(victim);
                }
            } else if table.insert(pid(next_pid), JobState::Background, "x &").is_ok() {
                next_pid += 1;
            }
            let jids: HashSet<_> = table.iter().map(|job| job.jid).collect();
            let pids: HashSet<_> = table.iter().map(|job| job.pid).collect();
            assert_eq!(jids.len(), table.len());
            assert_eq!(pids.len(), table.len());
            assert!(table.len() <= MAX_JOBS);
        }
    }

    #[test]
    fn background_ack_format() {
        let mut table = JobTable::new();
        let jid = table.insert(pid(4242), JobState::Background, "sleep 5 &").unwrap();
        let job = table.lookup_by_jid(jid).unwrap();
        assert_eq!(job.to_string(), "[1] (4242) sleep 5 &");
    }
}
