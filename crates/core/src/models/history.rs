//! Transaction history models and filters

use super::lenient::{f64_lenient, i64_lenient, i64_lenient_or_zero};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Record types shown in the history view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Deposit,
    Withdraw,
    Transfer,
    Bonus,
    Rebate,
    Lottery,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Deposit => "deposit",
            RecordType::Withdraw => "withdraw",
            RecordType::Transfer => "transfer",
            RecordType::Bonus => "bonus",
            RecordType::Rebate => "rebate",
            RecordType::Lottery => "lottery",
        }
    }
}

/// Query parameters for `GET /api/history`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub record_type: Option<RecordType>,
    pub page: u32,
    pub page_size: u32,
}

impl HistoryFilter {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn of_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    /// Query string pairs; unset fields are omitted
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(start) = self.start {
            query.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end {
            query.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        if let Some(t) = self.record_type {
            query.push(("type", t.as_str().to_string()));
        }
        query.push(("page", self.page.max(1).to_string()));
        query.push(("page_size", if self.page_size == 0 { 50 } else { self.page_size }.to_string()));
        query
    }
}

/// One history row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "i64_lenient")]
    pub id: i64,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(deserialize_with = "f64_lenient")]
    pub amount: f64,
    #[serde(default)]
    pub status: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub created_at: String,
}

impl HistoryRecord {
    pub fn created_date(&self) -> Option<NaiveDate> {
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.date())
            .or_else(|_| NaiveDate::parse_from_str(&self.created_at, "%Y-%m-%d"))
            .ok()
    }
}

/// Response page from `GET /api/history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub records: Vec<HistoryRecord>,
    #[serde(default, deserialize_with = "i64_lenient_or_zero")]
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query() {
        let filter = HistoryFilter::between(
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 7).unwrap(),
        )
        .of_type(RecordType::Deposit);
        let query = filter.to_query();
        assert!(query.contains(&("start_date", "2026-10-01".to_string())));
        assert!(query.contains(&("type", "deposit".to_string())));
        assert!(query.contains(&("page", "1".to_string())));
        assert!(query.contains(&("page_size", "50".to_string())));
    }

    #[test]
    fn test_created_date_parsing() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"id": 7, "type": "rebate", "amount": "1.20", "created_at": "2026-10-03 21:15:00"}"#,
        )
        .unwrap();
        assert_eq!(record.created_date(), NaiveDate::from_ymd_opt(2026, 10, 3));
    }
}
