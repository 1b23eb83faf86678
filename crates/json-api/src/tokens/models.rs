//! Distributed key wire models.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use sublet_app::domain::{
    tokens::{data::IssuedToken, records::TokenRecord},
    usage::records::{DailyUsage, UsageTotals},
};

use crate::timestamps::{utc, utc_opt};

/// Distributed key summary. Never carries the secret or its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct TokenItem {
    pub id: String,
    pub name: String,
    pub note: String,
    pub key_prefix: String,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub rate_limit_per_minute: i32,
    pub last_used_at: Option<String>,
    pub created_at: String,
}

impl From<&TokenRecord> for TokenItem {
    fn from(token: &TokenRecord) -> Self {
        Self {
            id: token.uuid.to_string(),
            name: token.name.clone(),
            note: token.note.clone(),
            key_prefix: token.key_prefix.clone(),
            is_active: token.is_active,
            expires_at: utc_opt(token.expires_at),
            rate_limit_per_minute: token.rate_limit_per_minute,
            last_used_at: utc_opt(token.last_used_at),
            created_at: utc(token.created_at),
        }
    }
}

/// Distributed key summary with its all-time usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct TokenListItem {
    pub id: String,
    pub name: String,
    pub note: String,
    pub key_prefix: String,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub rate_limit_per_minute: i32,
    pub last_used_at: Option<String>,
    pub created_at: String,
    pub total_count: i64,
    pub status_2xx: i64,
    pub status_4xx: i64,
    pub status_5xx: i64,
}

impl TokenListItem {
    pub(crate) fn new(token: &TokenRecord, usage: UsageTotals) -> Self {
        let item = TokenItem::from(token);

        Self {
            id: item.id,
            name: item.name,
            note: item.note,
            key_prefix: item.key_prefix,
            is_active: item.is_active,
            expires_at: item.expires_at,
            rate_limit_per_minute: item.rate_limit_per_minute,
            last_used_at: item.last_used_at,
            created_at: item.created_at,
            total_count: usage.total,
            status_2xx: usage.status_2xx,
            status_4xx: usage.status_4xx,
            status_5xx: usage.status_5xx,
        }
    }
}

/// Request counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct UsageCounts {
    pub total_count: i64,
    pub status_2xx: i64,
    pub status_4xx: i64,
    pub status_5xx: i64,
}

impl From<UsageTotals> for UsageCounts {
    fn from(totals: UsageTotals) -> Self {
        Self {
            total_count: totals.total,
            status_2xx: totals.status_2xx,
            status_4xx: totals.status_4xx,
            status_5xx: totals.status_5xx,
        }
    }
}

/// One UTC day of request counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub(crate) struct DailyCounts {
    /// `YYYY-MM-DD`
    pub date: String,
    pub total_count: i64,
    pub status_2xx: i64,
    pub status_4xx: i64,
    pub status_5xx: i64,
}

impl From<&DailyUsage> for DailyCounts {
    fn from(day: &DailyUsage) -> Self {
        Self {
            date: day.date.to_string(),
            total_count: day.totals.total,
            status_2xx: day.totals.status_2xx,
            status_4xx: day.totals.status_4xx,
            status_5xx: day.totals.status_5xx,
        }
    }
}

/// A key alongside its plaintext secret, shown exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub(crate) struct IssuedTokenResponse {
    pub plain_key: String,
    pub item: TokenItem,
}

impl From<&IssuedToken> for IssuedTokenResponse {
    fn from(issued: &IssuedToken) -> Self {
        Self {
            plain_key: issued.plain.expose().to_owned(),
            item: TokenItem::from(&issued.token),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub(crate) struct TokenResponse {
    pub item: TokenItem,
}

#[cfg(test)]
pub(crate) mod tests {
    use jiff::Timestamp;
    use sublet_app::domain::tokens::records::TokenUuid;
    use testresult::TestResult;

    use super::*;

    pub(crate) fn make_token(uuid: TokenUuid) -> TokenRecord {
        TokenRecord {
            uuid,
            name: "Team A".to_owned(),
            note: String::new(),
            token_hash: "digest".to_owned(),
            token_ciphertext: "ciphertext".to_owned(),
            key_prefix: "uk_live_abcdef".to_owned(),
            is_active: true,
            expires_at: None,
            rate_limit_per_minute: 60,
            last_used_at: None,
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn item_renders_absent_times_as_null() -> TestResult {
        let token = make_token(TokenUuid::new());
        let item = TokenItem::from(&token);

        assert_eq!(item.expires_at, None);
        assert_eq!(item.last_used_at, None);
        assert_eq!(item.created_at, "1970-01-01T00:00:00Z");

        let json = serde_json::to_value(&item)?;

        assert!(
            json.get("expires_at").is_some_and(serde_json::Value::is_null),
            "absent expiry must be null"
        );
        assert!(json.get("token_hash").is_none(), "digest must not leak");

        Ok(())
    }
}
