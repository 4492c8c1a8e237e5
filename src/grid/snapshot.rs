//! Typed job status snapshots.
//!
//! The scheduler's detailed-status program prints `key = value` lines;
//! each poll parses one fresh snapshot from that output. An empty
//! snapshot means the scheduler no longer knows the job, which is the
//! expected signal for "already terminated" rather than an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scheduler-reported job state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Exiting after having run; still in the scheduler's tables.
    Exiting,
    /// Held.
    Held,
    /// Queued, eligible to run or routed.
    Queued,
    /// Running.
    Running,
    /// Being moved to a new location.
    Moving,
    /// Waiting for its execution time to be reached.
    Waiting,
    /// Suspended.
    Suspended,
    /// Any state code this crate does not model.
    Unknown,
}

impl JobState {
    /// Parse a scheduler state code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "E" => JobState::Exiting,
            "H" => JobState::Held,
            "Q" => JobState::Queued,
            "R" => JobState::Running,
            "T" => JobState::Moving,
            "W" => JobState::Waiting,
            "S" => JobState::Suspended,
            _ => JobState::Unknown,
        }
    }

    /// Whether a job in this state is still the scheduler's problem.
    ///
    /// Exiting counts: the job has not yet fully cleared the scheduler's
    /// tables. Suspended and unknown codes do not.
    pub fn counts_as_running(&self) -> bool {
        matches!(
            self,
            JobState::Exiting
                | JobState::Held
                | JobState::Queued
                | JobState::Running
                | JobState::Moving
                | JobState::Waiting
        )
    }
}

/// One point-in-time parse of the scheduler's status output for a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    fields: HashMap<String, String>,
}

impl StatusSnapshot {
    /// Parse the output of the detailed-status program.
    ///
    /// Lines without a ` = ` separator (banners, continuations) are
    /// skipped. An unknown job yields empty output and therefore an empty
    /// snapshot.
    pub fn parse(output: &str) -> Self {
        let mut fields = HashMap::new();
        for line in output.lines() {
            if let Some((key, value)) = line.split_once(" = ") {
                fields.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { fields }
    }

    /// Whether the scheduler reported nothing for the job.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a raw reported field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The reported job name, if present.
    pub fn job_name(&self) -> Option<&str> {
        self.get("Job_Name")
    }

    /// The parsed state code, if the snapshot carries one.
    pub fn state(&self) -> Option<JobState> {
        self.get("job_state").map(JobState::from_code)
    }

    /// The recorded exit code, reported once the job has finished but is
    /// still listed.
    pub fn exit_status(&self) -> Option<i32> {
        self.get("exit_status").and_then(|v| v.parse().ok())
    }

    /// Whether this snapshot reports the job as still running.
    pub fn reports_running(&self) -> bool {
        self.state().is_some_and(|s| s.counts_as_running())
    }

    /// Iterate over all reported fields.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
