//! Wallet, deposit and turnover models

use super::lenient::{f64_lenient, f64_lenient_or_zero, i64_lenient, i64_lenient_or_zero};
use serde::{Deserialize, Serialize};

/// Response from `GET /api/wallet/balance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Main (withdrawable) wallet
    #[serde(deserialize_with = "f64_lenient")]
    pub balance: f64,
    /// Bonus wallet, locked by turnover
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub bonus_balance: f64,
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub coin_balance: f64,
}

/// Body for `POST /api/deposit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: f64,
    /// Payment channel identifier, e.g. "bank_transfer"
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<i64>,
}

impl DepositRequest {
    pub fn bank_transfer(amount: f64) -> Self {
        Self {
            amount,
            channel: "bank_transfer".to_string(),
            promotion_id: None,
        }
    }
}

/// Deposit lifecycle as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Approved,
    Rejected,
}

/// Response from `POST /api/deposit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositReceipt {
    #[serde(deserialize_with = "i64_lenient")]
    pub deposit_id: i64,
    #[serde(deserialize_with = "f64_lenient")]
    pub amount: f64,
    pub status: DepositStatus,
}

/// Response from `GET /api/turnover/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoverStatus {
    /// Wagering still required before bonus funds unlock
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub remaining: f64,
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub required: f64,
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub is_locked: i64,
}

impl TurnoverStatus {
    pub fn locked(&self) -> bool {
        self.is_locked != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_accepts_formatted_strings() {
        let wallet: WalletBalance =
            serde_json::from_str(r#"{"balance": "1,250.50", "bonus_balance": 3}"#).unwrap();
        assert_eq!(wallet.balance, 1250.5);
        assert_eq!(wallet.bonus_balance, 3.0);
        assert_eq!(wallet.coin_balance, 0.0);
    }
}
