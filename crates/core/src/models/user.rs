//! Authentication, registration and referral models

use super::lenient::{f64_lenient_or_zero, i64_lenient, i64_lenient_or_zero};
use crate::types::Language;
use serde::{Deserialize, Serialize};

/// Body for `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response from `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(deserialize_with = "i64_lenient")]
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
}

/// Body for `POST /api/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub phone: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

/// Response from `POST /api/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(deserialize_with = "i64_lenient")]
    pub user_id: i64,
}

/// Response from `GET /api/referral/summary`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralSummary {
    #[serde(default)]
    pub invite_code: String,
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub invited_count: i64,
    #[serde(default, deserialize_with = "f64_lenient_or_zero")]
    pub total_rebate: f64,
}

/// Response from `GET /api/lottery/cards`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryCards {
    /// 4D cards available for betting
    #[serde(deserialize_with = "i64_lenient")]
    pub cards: i64,
}
