/// Position of a poll job in its recurring cycle.
///
/// `Queued -> Running -> Sleeping -> Queued` repeats until a stop is observed,
/// after which the job settles in `Stopped` and never leaves it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum JobState {
    Queued,
    Running,
    Sleeping,
    Stopped,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        }
    }

    /// True while the job holds a worker slot.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Running | Self::Sleeping)
    }
}
