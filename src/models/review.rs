//! Review outcomes fed to the scheduler.
//!
//! Two grading schemes exist and are not interchangeable:
//! - `Recalled(bool)`: knew it / did not know it, used by the leveled policy
//! - `Graded(Quality)`: SM-2 style 0-5 quality, used by the ease-factor policy
//!
//! Quality grades:
//! - 0: Complete blackout
//! - 1: Incorrect, but the answer was recognised
//! - 2: Incorrect, but the answer seemed easy once shown
//! - 3: Correct with serious difficulty
//! - 4: Correct after hesitation
//! - 5: Perfect response

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;
    /// Lowest grade that counts as a successful recall.
    pub const PASSING: u8 = 3;

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value > Self::MAX {
            return Err(ValidationError::QualityOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lapse(self) -> bool {
        self.0 < Self::PASSING
    }
}

impl TryFrom<u8> for Quality {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewOutcome {
    Recalled(bool),
    Graded(Quality),
}

impl ReviewOutcome {
    pub fn is_lapse(self) -> bool {
        match self {
            ReviewOutcome::Recalled(correct) => !correct,
            ReviewOutcome::Graded(q) => q.is_lapse(),
        }
    }

    pub(crate) fn kind(self) -> &'static str {
        match self {
            ReviewOutcome::Recalled(_) => "boolean",
            ReviewOutcome::Graded(_) => "graded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_range() {
        assert!(Quality::new(0).is_ok());
        assert!(Quality::new(5).is_ok());
        assert_eq!(Quality::new(6), Err(ValidationError::QualityOutOfRange(6)));
        assert_eq!(Quality::try_from(200), Err(ValidationError::QualityOutOfRange(200)));
    }

    #[test]
    fn test_lapse_threshold() {
        assert!(Quality::new(2).unwrap().is_lapse());
        assert!(!Quality::new(3).unwrap().is_lapse());
        assert!(ReviewOutcome::Recalled(false).is_lapse());
        assert!(!ReviewOutcome::Recalled(true).is_lapse());
    }

    #[test]
    fn test_quality_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Quality>("4").is_ok());
        assert!(serde_json::from_str::<Quality>("9").is_err());
    }
}
