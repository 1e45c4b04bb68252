//! Mission models

use super::lenient::{f64_lenient, f64_lenient_or_zero, i64_lenient, i64_lenient_or_zero};
use crate::types::Money;
use serde::{Deserialize, Serialize};

/// Mission category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionType {
    Topup,
    Withdraw,
    Loss,
    #[serde(other)]
    Other,
}

/// One entry of `GET /api/missions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    #[serde(deserialize_with = "i64_lenient")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub mission_type: MissionType,
    #[serde(deserialize_with = "f64_lenient")]
    pub target: f64,
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub progress: f64,
    /// 0 = not claimed, 1 = claimed
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub is_claimed: i64,
    /// Reward description, e.g. `{"bonus": 5}`
    #[serde(default)]
    pub reward: serde_json::Value,
}

impl Mission {
    /// Progress has reached the target exactly (compared in cents)
    pub fn is_complete(&self) -> bool {
        Money::new(self.progress).cents() == Money::new(self.target).cents()
    }

    pub fn claimed(&self) -> bool {
        self.is_claimed != 0
    }
}

/// Response from `POST /api/missions/{id}/claim`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionClaimResponse {
    #[serde(deserialize_with = "i64_lenient")]
    pub mission_id: i64,
    #[serde(default)]
    pub reward: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(progress: f64, target: f64, is_claimed: i64) -> Mission {
        Mission {
            id: 7,
            title: String::new(),
            mission_type: MissionType::Topup,
            target,
            progress,
            is_claimed,
            reward: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_complete_only_at_target() {
        assert!(mission(30.0, 30.0, 0).is_complete());
        assert!(!mission(29.99, 30.0, 0).is_complete());
        assert!(!mission(60.0, 30.0, 0).is_complete());
        assert!(mission(30.0, 30.0, 1).claimed());
    }
}
