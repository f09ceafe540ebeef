/// Job status definitions for tracking analysis progress
///
/// This module defines all states a submitted URL can be in and which moves
/// between them are legal.
use std::fmt;

/// Represents the current status of an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    // ===== Active States =====
    /// Waiting to be claimed by the dispatcher
    Queued,

    /// Claimed by a worker; a crawl is (or was, before a crash) in progress
    Running,

    // ===== Terminal States =====
    /// Crawl finished and the result fields are populated
    Done,

    /// Fetch or parse failed; the error field carries the reason
    Error,

    /// Stopped from outside the worker subsystem while running
    Stopped,
}

impl JobStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [JobStatus; 5] = [
        Self::Queued,
        Self::Running,
        Self::Done,
        Self::Error,
        Self::Stopped,
    ];

    /// Returns true if no worker will touch the job again without a requeue
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Stopped)
    }

    /// Returns true if the job is waiting for or undergoing a crawl
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// - `queued -> running` (claim)
    /// - `running -> done | error` (worker write-back)
    /// - `running -> stopped` (external stop)
    /// - `any -> queued` (external requeue)
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (_, Self::Queued) => true,
            (Self::Queued, Self::Running) => true,
            (Self::Running, Self::Done | Self::Error | Self::Stopped) => true,
            _ => false,
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}
