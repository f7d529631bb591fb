use demandlens_core::GroupKey;

/// One unit of per-group analysis.
///
/// Jobs own their inputs (already-aligned series, lookups) and must not touch
/// shared mutable state, so any scheduler may run them in any order.
pub trait AnalyticsJob: Send + Sync {
    type Output: Send;
    type Error: core::fmt::Display;

    /// The group this job analyses.
    fn key(&self) -> &GroupKey;

    /// Run the analysis. Errors are per-group and never abort sibling jobs.
    fn run(&self) -> Result<Self::Output, Self::Error>;
}

/// Tagged failure for a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub key: GroupKey,
    pub reason: String,
    /// The job panicked rather than returning an error.
    pub panicked: bool,
}

impl GroupFailure {
    pub fn new(key: GroupKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
            panicked: false,
        }
    }

    pub fn panicked(key: GroupKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
            panicked: true,
        }
    }
}

impl core::fmt::Display for GroupFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.panicked {
            write!(f, "{}: panicked: {}", self.key, self.reason)
        } else {
            write!(f, "{}: {}", self.key, self.reason)
        }
    }
}
