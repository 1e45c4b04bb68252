//! VIP tier models

use super::lenient::{f64_lenient, i64_lenient};
use serde::{Deserialize, Serialize};

/// Tier definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipTier {
    #[serde(deserialize_with = "i64_lenient")]
    pub level: i64,
    #[serde(default)]
    pub name: String,
    /// Cumulative deposit needed to reach this tier
    #[serde(deserialize_with = "f64_lenient")]
    pub recharge: f64,
}

/// User side of the VIP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipUser {
    #[serde(deserialize_with = "i64_lenient")]
    pub vip_level: i64,
    /// Cumulative deposit so far
    #[serde(deserialize_with = "f64_lenient")]
    pub paysum: f64,
}

/// Response from `GET /api/vip/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipInfo {
    pub user: VipUser,
    /// None at the top tier
    #[serde(default)]
    pub next_vip: Option<VipTier>,
    #[serde(default)]
    pub tiers: Vec<VipTier>,
}

impl VipInfo {
    /// Deposit still needed for the next tier (`next_vip.recharge - user.paysum`)
    pub fn remaining_to_next(&self) -> Option<f64> {
        self.next_vip
            .as_ref()
            .map(|next| next.recharge - self.user.paysum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_to_next() {
        let info: VipInfo = serde_json::from_str(
            r#"{"user": {"vip_level": 1, "paysum": "120"}, "next_vip": {"level": 2, "recharge": 500}}"#,
        )
        .unwrap();
        assert_eq!(info.remaining_to_next(), Some(380.0));
    }

    #[test]
    fn test_top_tier_has_no_remaining() {
        let info: VipInfo =
            serde_json::from_str(r#"{"user": {"vip_level": 9, "paysum": 99999}, "next_vip": null}"#).unwrap();
        assert_eq!(info.remaining_to_next(), None);
    }
}
