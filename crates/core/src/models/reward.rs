//! Reward kinds, reward deltas, and the check-in / spin endpoints' models

use super::lenient::{f64_lenient_or_zero, i64_lenient, i64_lenient_or_zero};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of reward kinds the platform can credit.
///
/// An unrecognized kind is a hard failure, never skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RewardKind {
    #[serde(rename = "bonus")]
    Bonus,
    #[serde(rename = "ticket")]
    Ticket,
    #[serde(rename = "spin")]
    Spin,
    #[serde(rename = "coin")]
    Coin,
    #[serde(rename = "4dCard")]
    FourDCard,
}

impl RewardKind {
    pub const ALL: [RewardKind; 5] = [
        RewardKind::Bonus,
        RewardKind::Ticket,
        RewardKind::Spin,
        RewardKind::Coin,
        RewardKind::FourDCard,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            RewardKind::Bonus => "bonus",
            RewardKind::Ticket => "ticket",
            RewardKind::Spin => "spin",
            RewardKind::Coin => "coin",
            RewardKind::FourDCard => "4dCard",
        }
    }

    /// Balance field that grows when this kind is credited.
    /// Tickets are redeemed as 4D cards, so both land on the same counter.
    pub fn balance_field(&self) -> &'static str {
        match self {
            RewardKind::Bonus => "bonus_balance",
            RewardKind::Ticket | RewardKind::FourDCard => "lottery_cards",
            RewardKind::Spin => "spin_count",
            RewardKind::Coin => "coin_balance",
        }
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for RewardKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "bonus" => Ok(RewardKind::Bonus),
            "ticket" => Ok(RewardKind::Ticket),
            "spin" => Ok(RewardKind::Spin),
            "coin" => Ok(RewardKind::Coin),
            "4dCard" | "4d_card" | "4dcard" => Ok(RewardKind::FourDCard),
            other => Err(Error::UnknownRewardKind(other.to_string())),
        }
    }
}

/// Expected increase per reward kind after a claim or win event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardDelta {
    amounts: BTreeMap<RewardKind, f64>,
}

impl RewardDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a delta from a backend reward description.
    ///
    /// Accepts either an object (`{"bonus": 5, "ticket": "1"}`) or a list of
    /// `{"type": ..., "amount": ...}` entries. Repeated kinds accumulate.
    pub fn from_reward_dict(reward: &serde_json::Value) -> Result<Self> {
        let mut delta = RewardDelta::new();
        match reward {
            serde_json::Value::Object(map) => {
                for (kind, amount) in map {
                    delta.add(kind.parse()?, parse_amount(kind, amount)?);
                }
            }
            serde_json::Value::Array(entries) => {
                for entry in entries {
                    let kind = entry
                        .get("type")
                        .and_then(|k| k.as_str())
                        .ok_or_else(|| Error::InvalidData(format!("reward entry without type: {}", entry)))?;
                    let amount = entry.get("amount").unwrap_or(&serde_json::Value::Null);
                    delta.add(kind.parse()?, parse_amount(kind, amount)?);
                }
            }
            serde_json::Value::Null => {}
            other => {
                return Err(Error::InvalidData(format!(
                    "reward description must be an object or list, got {}",
                    other
                )))
            }
        }
        Ok(delta)
    }

    pub fn add(&mut self, kind: RewardKind, amount: f64) {
        *self.amounts.entry(kind).or_insert(0.0) += amount;
    }

    /// Include the free 4D ticket every daily check-in grants
    pub fn with_daily_ticket(mut self) -> Self {
        self.add(RewardKind::Ticket, 1.0);
        self
    }

    pub fn get(&self, kind: RewardKind) -> f64 {
        self.amounts.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.values().all(|v| *v == 0.0)
    }

    /// Expected 4D card increase: ticket rewards plus explicit card rewards
    pub fn expected_card_increase(&self) -> f64 {
        self.get(RewardKind::Ticket) + self.get(RewardKind::FourDCard)
    }

    /// Expected increase per balance field, merging kinds that share a field
    pub fn by_balance_field(&self) -> BTreeMap<&'static str, f64> {
        let mut fields = BTreeMap::new();
        for (kind, amount) in &self.amounts {
            if *amount != 0.0 {
                *fields.entry(kind.balance_field()).or_insert(0.0) += amount;
            }
        }
        fields
    }

    /// Project the expected after-value of one balance field
    pub fn apply(&self, field: &str, before: f64) -> f64 {
        before + self.by_balance_field().get(field).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RewardKind, f64)> + '_ {
        self.amounts.iter().map(|(k, v)| (*k, *v))
    }
}

fn parse_amount(kind: &str, amount: &serde_json::Value) -> Result<f64> {
    match amount {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::InvalidData(format!("reward '{}' amount out of range", kind))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidData(format!("reward '{}' amount '{}' is not numeric", kind, s))),
        other => Err(Error::InvalidData(format!(
            "reward '{}' amount must be numeric, got {}",
            kind, other
        ))),
    }
}

/// One day of the check-in calendar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinDay {
    #[serde(deserialize_with = "i64_lenient")]
    pub day: i64,
    /// Reward description for this day, e.g. `{"coin": 10, "bonus": 2}`
    #[serde(default)]
    pub reward: serde_json::Value,
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub is_checked: i64,
}

/// Response from `GET /api/checkin/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinStatus {
    /// Consecutive days checked in
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub streak: i64,
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub today_checked: i64,
    #[serde(default)]
    pub days: Vec<CheckinDay>,
}

impl CheckinStatus {
    /// Reward description of the calendar day the next check-in lands on
    pub fn next_reward(&self) -> Option<&serde_json::Value> {
        let next = self.streak + 1;
        self.days.iter().find(|d| d.day == next).map(|d| &d.reward)
    }
}

/// Response from `GET /api/wheel/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinStatus {
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub spin_count: i64,
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub coin_balance: f64,
}
