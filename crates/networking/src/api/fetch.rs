//! Authoritative data fetcher: semantic queries answered by the backend

use crate::BackendClient;
use reconciler_core::{Error, HistoryFilter, Mission, Result, Snapshot, Value};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, instrument};

/// A semantic quantity the backend is the source of truth for
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    WalletBalance,
    BonusBalance,
    CoinBalance,
    MissionProgress(i64),
    /// `is_claimed` as a count (0 / 1)
    MissionClaimed(i64),
    /// `next_vip.recharge - user.paysum`
    VipRemaining,
    TurnoverLocked,
    LotteryCards,
    SpinCount,
    ReferralCount,
    HistoryCount(HistoryFilter),
    /// One date snapshot per record on the requested page
    HistoryDates(HistoryFilter),
    HistoryIds(HistoryFilter),
}

impl Query {
    /// Field name shared with the UI sampler for the same quantity
    pub fn field_name(&self) -> String {
        match self {
            Query::WalletBalance => "wallet_balance".to_string(),
            Query::BonusBalance => "bonus_balance".to_string(),
            Query::CoinBalance => "coin_balance".to_string(),
            Query::MissionProgress(id) => format!("mission_{}_progress", id),
            Query::MissionClaimed(id) => format!("mission_{}_claimed", id),
            Query::VipRemaining => "vip_remaining".to_string(),
            Query::TurnoverLocked => "turnover_locked".to_string(),
            Query::LotteryCards => "lottery_cards".to_string(),
            Query::SpinCount => "spin_count".to_string(),
            Query::ReferralCount => "referral_count".to_string(),
            Query::HistoryCount(_) => "history_count".to_string(),
            Query::HistoryDates(_) => "history_date".to_string(),
            Query::HistoryIds(_) => "history_ids".to_string(),
        }
    }

    /// Query answering a reward balance field (see `RewardKind::balance_field`)
    pub fn for_balance_field(field: &str) -> Option<Query> {
        match field {
            "wallet_balance" => Some(Query::WalletBalance),
            "bonus_balance" => Some(Query::BonusBalance),
            "coin_balance" => Some(Query::CoinBalance),
            "lottery_cards" => Some(Query::LotteryCards),
            "spin_count" => Some(Query::SpinCount),
            "referral_count" => Some(Query::ReferralCount),
            _ => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field_name())
    }
}

/// Turns semantic queries into API-tagged snapshots.
///
/// Errors surface immediately; retrying is the poll driver's job.
#[derive(Clone)]
pub struct Fetcher {
    client: BackendClient,
}

impl Fetcher {
    /// `client` must carry the account's token
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Fetch a single-valued quantity
    pub async fn fetch(&self, query: &Query) -> Result<Snapshot> {
        let mut snapshots = self.fetch_many(query).await?;
        if snapshots.len() != 1 {
            return Err(Error::InvalidData(format!(
                "{} yielded {} values, expected exactly one",
                query,
                snapshots.len()
            )));
        }
        Ok(snapshots.remove(0))
    }

    /// Fetch a quantity that may have several values (history dates)
    #[instrument(skip(self, query), fields(query = %query))]
    pub async fn fetch_many(&self, query: &Query) -> Result<Vec<Snapshot>> {
        let field = query.field_name();
        let single = |value: Value| -> Result<Vec<Snapshot>> { Ok(vec![Snapshot::api(field.clone(), value)]) };

        let snapshots = match query {
            Query::WalletBalance => single(Value::Amount(self.client.get_wallet_balance().await?.balance)),
            Query::BonusBalance => single(Value::Amount(self.client.get_wallet_balance().await?.bonus_balance)),
            Query::CoinBalance => single(Value::Amount(self.client.get_spin_status().await?.coin_balance)),
            Query::MissionProgress(id) => {
                let mission = self.fetch_mission(*id).await?;
                single(Value::Amount(mission.progress))
            }
            Query::MissionClaimed(id) => {
                let mission = self.fetch_mission(*id).await?;
                single(Value::Count(mission.is_claimed))
            }
            Query::VipRemaining => {
                let info = self.client.get_vip_info().await?;
                let remaining = info.remaining_to_next().ok_or_else(|| {
                    Error::InvalidData("user is at the top VIP tier; no next tier".to_string())
                })?;
                single(Value::Amount(remaining))
            }
            Query::TurnoverLocked => {
                single(Value::Flag(self.client.get_turnover_status().await?.locked()))
            }
            Query::LotteryCards => single(Value::Count(self.client.get_lottery_cards().await?.cards)),
            Query::SpinCount => single(Value::Count(self.client.get_spin_status().await?.spin_count)),
            Query::ReferralCount => {
                single(Value::Count(self.client.get_referral_summary().await?.invited_count))
            }
            Query::HistoryCount(filter) => single(Value::Count(self.client.get_history(filter).await?.total)),
            Query::HistoryIds(filter) => {
                let page = self.client.get_history(filter).await?;
                let ids: BTreeSet<String> = page.records.iter().map(|r| r.id.to_string()).collect();
                single(Value::Ids(ids))
            }
            Query::HistoryDates(filter) => {
                let page = self.client.get_history(filter).await?;
                page.records
                    .iter()
                    .map(|record| {
                        let date = record.created_date().ok_or_else(|| {
                            Error::InvalidData(format!(
                                "history record {} has unparseable date '{}'",
                                record.id, record.created_at
                            ))
                        })?;
                        Ok(Snapshot::api(field.clone(), Value::Date(date)))
                    })
                    .collect::<Result<Vec<_>>>()
            }
        }?;

        debug!("Fetched {} snapshot(s) for {}", snapshots.len(), field);
        Ok(snapshots)
    }

    /// Look up one mission by id
    pub async fn fetch_mission(&self, mission_id: i64) -> Result<Mission> {
        self.client
            .get_missions()
            .await?
            .into_iter()
            .find(|m| m.id == mission_id)
            .ok_or_else(|| Error::InvalidData(format!("mission {} not found", mission_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler_core::{Language, Source};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, route: &str, data: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 0, "msg": "ok", "data": data})),
            )
            .mount(server)
            .await;
    }

    fn fetcher(server: &MockServer) -> Fetcher {
        Fetcher::new(
            BackendClient::new(&server.uri(), Language::En)
                .unwrap()
                .with_token("t"),
        )
    }

    #[tokio::test]
    async fn test_wallet_balance_snapshot_is_api_tagged() {
        let server = MockServer::start().await;
        serve(&server, "/api/wallet/balance", serde_json::json!({"balance": 42.5, "bonus_balance": 1})).await;

        let snap = fetcher(&server).fetch(&Query::WalletBalance).await.unwrap();
        assert_eq!(snap.field_name(), "wallet_balance");
        assert_eq!(snap.value(), &Value::Amount(42.5));
        assert_eq!(snap.source(), Source::Api);
    }

    #[tokio::test]
    async fn test_null_balance_is_invalid_data_not_zero() {
        let server = MockServer::start().await;
        serve(&server, "/api/wallet/balance", serde_json::json!({"balance": null, "bonus_balance": null})).await;

        let result = fetcher(&server).fetch(&Query::WalletBalance).await;
        assert!(matches!(result, Err(Error::InvalidData(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_vip_remaining() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/api/vip/info",
            serde_json::json!({"user": {"vip_level": 0, "paysum": 30}, "next_vip": {"level": 1, "recharge": 100}}),
        )
        .await;

        let snap = fetcher(&server).fetch(&Query::VipRemaining).await.unwrap();
        assert_eq!(snap.value(), &Value::Amount(70.0));
    }

    #[tokio::test]
    async fn test_mission_claimed_and_missing_mission() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/api/missions",
            serde_json::json!([{"id": 3, "type": "topup", "target": 30, "progress": 30, "is_claimed": 1}]),
        )
        .await;

        let f = fetcher(&server);
        let claimed = f.fetch(&Query::MissionClaimed(3)).await.unwrap();
        assert_eq!(claimed.value(), &Value::Count(1));
        assert!(matches!(f.fetch(&Query::MissionProgress(9)).await, Err(Error::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_history_dates_one_per_record() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/api/history",
            serde_json::json!({"total": 2, "records": [
                {"id": 1, "type": "deposit", "amount": 10, "created_at": "2026-10-01 08:00:00"},
                {"id": 2, "type": "deposit", "amount": 20, "created_at": "2026-10-05 23:59:59"}
            ]}),
        )
        .await;

        let f = fetcher(&server);
        let dates = f
            .fetch_many(&Query::HistoryDates(HistoryFilter::default()))
            .await
            .unwrap();
        assert_eq!(dates.len(), 2);
        assert!(f.fetch(&Query::HistoryDates(HistoryFilter::default())).await.is_err());

        let ids = f.fetch(&Query::HistoryIds(HistoryFilter::default())).await.unwrap();
        assert_eq!(ids.value().to_string(), "{1, 2}");
    }
}
