use std::fmt;

use serde::{Deserialize, Serialize};

use super::BatchOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub succeeded: usize,
    pub attempted: usize,
}

impl Tally {
    pub fn new(succeeded: usize, attempted: usize) -> Self {
        Self { succeeded, attempted }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn is_complete(&self) -> bool {
        self.succeeded == self.attempted
    }
}

impl From<&BatchOutcome> for Tally {
    fn from(outcome: &BatchOutcome) -> Self {
        Self::new(outcome.succeeded(), outcome.attempted())
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(f, "{}", self.succeeded)
        } else {
            write!(f, "{}/{}", self.succeeded, self.attempted)
        }
    }
}

/// Per-entity tallies returned to the caller after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub families: Tally,
    pub guardians: Tally,
    pub students: Tally,
    pub classes: Tally,
    pub enrollments: Tally,
    pub roster: Tally,
}

impl SyncSummary {
    /// True when every stage upserted every item it attempted.
    pub fn is_complete(&self) -> bool {
        self.entries().iter().all(|(_, t)| t.is_complete())
    }

    pub fn entries(&self) -> [(&'static str, Tally); 6] {
        [
            ("families", self.families),
            ("guardians", self.guardians),
            ("students", self.students),
            ("classes", self.classes),
            ("enrollments", self.enrollments),
            ("roster", self.roster),
        ]
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .iter()
            .map(|(name, tally)| format!("{} {}", tally, name))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_display_collapses_when_complete() {
        assert_eq!(Tally::new(3, 3).to_string(), "3");
        assert_eq!(Tally::new(2, 3).to_string(), "2/3");
        assert_eq!(Tally::new(2, 3).failed(), 1);
    }

    #[test]
    fn summary_line_lists_every_entity() {
        let summary = SyncSummary {
            families: Tally::new(3, 3),
            guardians: Tally::new(4, 4),
            students: Tally::new(2, 3),
            classes: Tally::new(1, 1),
            enrollments: Tally::new(3, 3),
            roster: Tally::new(3, 3),
        };
        assert_eq!(
            summary.to_string(),
            "3 families, 4 guardians, 2/3 students, 1 classes, 3 enrollments, 3 roster"
        );
        assert!(!summary.is_complete());
    }

    #[test]
    fn tally_from_outcome_counts_failures() {
        let mut outcome = BatchOutcome::default();
        outcome.id_map.insert("a".into(), "rec1".into());
        outcome.failed = 2;
        assert_eq!(Tally::from(&outcome), Tally::new(1, 3));
    }
}
