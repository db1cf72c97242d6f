//! Vote - One peer's opinion on an idea

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ids::{IdeaId, VoterId};

/// Vote value, serialized as `-1`, `0` or `1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteValue {
    Down,
    Neutral,
    Up,
}

impl VoteValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = EngineError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Neutral),
            1 => Ok(VoteValue::Up),
            other => Err(EngineError::InvalidInput(format!(
                "vote value must be -1, 0 or 1, got {}",
                other
            ))),
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }
}

/// Vote record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub idea_id: IdeaId,
    pub voter_id: VoterId,
    pub value: VoteValue,
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(idea_id: IdeaId, voter_id: VoterId, value: VoteValue, cast_at: DateTime<Utc>) -> Self {
        Self {
            idea_id,
            voter_id,
            value,
            cast_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_value_conversion() {
        assert_eq!(VoteValue::try_from(-1i8).unwrap(), VoteValue::Down);
        assert_eq!(VoteValue::try_from(1i8).unwrap().as_i64(), 1);
        assert!(VoteValue::try_from(2i8).is_err());
    }

    #[test]
    fn test_vote_value_rejects_out_of_range_json() {
        assert_eq!(serde_json::to_string(&VoteValue::Down).unwrap(), "-1");
        assert!(serde_json::from_str::<VoteValue>("5").is_err());
    }
}
