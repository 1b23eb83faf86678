//! In-process repositories for tests and local tooling.
//!
//! Each mirrors the contract of its PostgreSQL counterpart: the same
//! uniqueness rules, the same ordering and atomic counter updates.

use async_trait::async_trait;
use jiff::{Timestamp, civil::Date};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{
    database::StoreError,
    domain::{
        admin_secret::repository::SettingsRepository,
        pool_keys::{
            records::{NewPoolKey, PoolKeyRecord, PoolKeyUuid},
            repository::PoolKeysRepository,
        },
        tokens::{
            data::{NewTokenRecord, RotatedSecret, TokenUpdate},
            records::{TokenRecord, TokenUuid},
            repository::TokensRepository,
        },
        usage::{
            records::{DailyUsage, StatusClass, TokenUsageTotals, UsageTotals},
            repository::UsageRepository,
        },
    },
};

#[derive(Debug, Default)]
struct TokenRows {
    // (insertion sequence, row); the sequence breaks created_at ties.
    rows: FxHashMap<TokenUuid, (u64, TokenRecord)>,
    next_sequence: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryTokensRepository {
    state: Mutex<TokenRows>,
}

#[async_trait]
impl TokensRepository for InMemoryTokensRepository {
    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let state = self.state.lock();

        let mut rows: Vec<_> = state.rows.values().cloned().collect();

        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_seq.cmp(a_seq))
        });

        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    async fn find_token(&self, token: TokenUuid) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.state.lock().rows.get(&token).map(|(_, row)| row.clone()))
    }

    async fn find_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .rows
            .values()
            .find(|(_, row)| row.token_hash == token_hash)
            .map(|(_, row)| row.clone()))
    }

    async fn create_token(&self, token: NewTokenRecord) -> Result<TokenRecord, StoreError> {
        let mut state = self.state.lock();

        if state.rows.contains_key(&token.uuid)
            || state
                .rows
                .values()
                .any(|(_, row)| row.token_hash == token.token_hash)
        {
            return Err(StoreError::AlreadyExists);
        }

        let now = Timestamp::now();
        let record = TokenRecord {
            uuid: token.uuid,
            name: token.name,
            note: token.note,
            token_hash: token.token_hash,
            token_ciphertext: token.token_ciphertext,
            key_prefix: token.key_prefix,
            is_active: true,
            expires_at: token.expires_at,
            rate_limit_per_minute: token.rate_limit_per_minute,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };

        let sequence = state.next_sequence;

        state.next_sequence += 1;
        state.rows.insert(record.uuid, (sequence, record.clone()));

        Ok(record)
    }

    async fn update_token_fields(
        &self,
        token: TokenUuid,
        update: TokenUpdate,
    ) -> Result<TokenRecord, StoreError> {
        let mut state = self.state.lock();

        let Some((_, row)) = state.rows.get_mut(&token) else {
            return Err(StoreError::NotFound);
        };

        if let Some(name) = update.name {
            row.name = name;
        }

        if let Some(note) = update.note {
            row.note = note;
        }

        if let Some(is_active) = update.is_active {
            row.is_active = is_active;
        }

        if update.clear_expires_at {
            row.expires_at = None;
        } else if let Some(expires_at) = update.expires_at {
            row.expires_at = Some(expires_at);
        }

        if let Some(rate_limit) = update.rate_limit_per_minute {
            row.rate_limit_per_minute = rate_limit;
        }

        row.updated_at = Timestamp::now();

        Ok(row.clone())
    }

    async fn rotate_token(
        &self,
        token: TokenUuid,
        secret: RotatedSecret,
    ) -> Result<TokenRecord, StoreError> {
        let mut state = self.state.lock();

        if state
            .rows
            .values()
            .any(|(_, row)| row.uuid != token && row.token_hash == secret.token_hash)
        {
            return Err(StoreError::AlreadyExists);
        }

        let Some((_, row)) = state.rows.get_mut(&token) else {
            return Err(StoreError::NotFound);
        };

        row.token_hash = secret.token_hash;
        row.token_ciphertext = secret.token_ciphertext;
        row.key_prefix = secret.key_prefix;
        row.is_active = true;
        row.last_used_at = None;
        row.updated_at = Timestamp::now();

        Ok(row.clone())
    }

    async fn delete_token(&self, token: TokenUuid) -> Result<(), StoreError> {
        self.state.lock().rows.remove(&token);

        Ok(())
    }

    async fn touch_last_used(&self, token: TokenUuid, when: Timestamp) -> Result<(), StoreError> {
        if let Some((_, row)) = self.state.lock().rows.get_mut(&token) {
            row.last_used_at = Some(when);
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUsageRepository {
    days: Mutex<FxHashMap<(TokenUuid, Date), UsageTotals>>,
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn increment(
        &self,
        token: TokenUuid,
        date: Date,
        class: StatusClass,
    ) -> Result<(), StoreError> {
        self.days
            .lock()
            .entry((token, date))
            .or_default()
            .record(class);

        Ok(())
    }

    async fn totals(&self, token: TokenUuid) -> Result<UsageTotals, StoreError> {
        Ok(self
            .days
            .lock()
            .iter()
            .filter(|((owner, _), _)| *owner == token)
            .fold(UsageTotals::default(), |acc, (_, day)| sum(acc, *day)))
    }

    async fn series(&self, token: TokenUuid, since: Date) -> Result<Vec<DailyUsage>, StoreError> {
        let mut series: Vec<_> = self
            .days
            .lock()
            .iter()
            .filter(|((owner, date), _)| *owner == token && *date >= since)
            .map(|((_, date), totals)| DailyUsage {
                date: *date,
                totals: *totals,
            })
            .collect();

        series.sort_by_key(|day| day.date);

        Ok(series)
    }

    async fn aggregate(&self) -> Result<Vec<TokenUsageTotals>, StoreError> {
        let mut by_token = FxHashMap::<TokenUuid, UsageTotals>::default();

        for ((token, _), day) in self.days.lock().iter() {
            let entry = by_token.entry(*token).or_default();

            *entry = sum(*entry, *day);
        }

        Ok(by_token
            .into_iter()
            .map(|(token, totals)| TokenUsageTotals { token, totals })
            .collect())
    }
}

fn sum(a: UsageTotals, b: UsageTotals) -> UsageTotals {
    UsageTotals {
        total: a.total + b.total,
        status_2xx: a.status_2xx + b.status_2xx,
        status_4xx: a.status_4xx + b.status_4xx,
        status_5xx: a.status_5xx + b.status_5xx,
    }
}

#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    values: Mutex<FxHashMap<String, String>>,
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.lock().insert(key.to_owned(), value.to_owned());

        Ok(())
    }

    async fn insert_setting_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut values = self.values.lock();

        if values.contains_key(key) {
            return Ok(false);
        }

        values.insert(key.to_owned(), value.to_owned());

        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPoolKeysRepository {
    keys: Mutex<Vec<PoolKeyRecord>>,
}

#[async_trait]
impl PoolKeysRepository for InMemoryPoolKeysRepository {
    async fn create_pool_key(&self, key: NewPoolKey) -> Result<PoolKeyRecord, StoreError> {
        let mut keys = self.keys.lock();

        if keys.iter().any(|existing| existing.key == key.key) {
            return Err(StoreError::AlreadyExists);
        }

        let now = Timestamp::now();
        let record = PoolKeyRecord {
            uuid: key.uuid,
            key: key.key,
            alias: key.alias,
            total_quota: key.total_quota,
            used_quota: 0,
            is_active: true,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };

        keys.push(record.clone());

        Ok(record)
    }

    async fn select_pool_key(&self) -> Result<Option<PoolKeyRecord>, StoreError> {
        let mut keys = self.keys.lock();

        // Least recently used first; never-used keys sort before any stamp.
        let chosen = keys
            .iter_mut()
            .filter(|key| key.is_active)
            .min_by(|a, b| {
                a.last_used_at
                    .cmp(&b.last_used_at)
                    .then_with(|| a.uuid.cmp(&b.uuid))
            });

        Ok(chosen.map(|key| {
            key.last_used_at = Some(Timestamp::now());
            key.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn new_token(hash: &str) -> NewTokenRecord {
        NewTokenRecord {
            uuid: TokenUuid::new(),
            name: "Key".to_owned(),
            note: String::new(),
            token_hash: hash.to_owned(),
            token_ciphertext: "ct".to_owned(),
            key_prefix: "uk_live_abcdef".to_owned(),
            expires_at: None,
            rate_limit_per_minute: 60,
        }
    }

    #[tokio::test]
    async fn duplicate_hash_is_already_exists() -> TestResult {
        let repository = InMemoryTokensRepository::default();

        repository.create_token(new_token("h1")).await?;

        assert!(matches!(
            repository.create_token(new_token("h1")).await,
            Err(StoreError::AlreadyExists)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn list_is_newest_first() -> TestResult {
        let repository = InMemoryTokensRepository::default();

        let first = repository.create_token(new_token("a")).await?;
        let second = repository.create_token(new_token("b")).await?;

        let listed: Vec<_> = repository
            .list_tokens()
            .await?
            .into_iter()
            .map(|token| token.uuid)
            .collect();

        assert_eq!(listed, vec![second.uuid, first.uuid]);

        Ok(())
    }

    #[tokio::test]
    async fn writes_to_a_missing_row_are_not_found() {
        let repository = InMemoryTokensRepository::default();
        let record = repository
            .create_token(new_token("x"))
            .await
            .expect("create succeeds");

        repository
            .delete_token(record.uuid)
            .await
            .expect("delete succeeds");

        assert!(matches!(
            repository
                .update_token_fields(
                    record.uuid,
                    TokenUpdate {
                        name: Some("renamed".to_owned()),
                        ..TokenUpdate::default()
                    },
                )
                .await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            repository
                .rotate_token(
                    record.uuid,
                    RotatedSecret {
                        token_hash: "y".to_owned(),
                        token_ciphertext: "ct".to_owned(),
                        key_prefix: "uk_live_abcdef".to_owned(),
                    },
                )
                .await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rotation_keeps_display_fields() -> TestResult {
        let repository = InMemoryTokensRepository::default();
        let record = repository.create_token(new_token("old")).await?;

        repository
            .update_token_fields(
                record.uuid,
                TokenUpdate {
                    note: Some("shared".to_owned()),
                    is_active: Some(false),
                    ..TokenUpdate::default()
                },
            )
            .await?;

        let rotated = repository
            .rotate_token(
                record.uuid,
                RotatedSecret {
                    token_hash: "new".to_owned(),
                    token_ciphertext: "ct2".to_owned(),
                    key_prefix: "uk_live_ghijkl".to_owned(),
                },
            )
            .await?;

        assert_eq!(rotated.note, "shared");
        assert!(rotated.is_active);
        assert_eq!(rotated.created_at, record.created_at);
        assert!(repository.find_token_by_hash("old").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn pool_selection_rotates() -> TestResult {
        let repository = InMemoryPoolKeysRepository::default();

        for key in ["k1", "k2"] {
            repository
                .create_pool_key(NewPoolKey {
                    uuid: PoolKeyUuid::new(),
                    key: key.to_owned(),
                    alias: "Default".to_owned(),
                    total_quota: 10,
                })
                .await?;
        }

        let first = repository.select_pool_key().await?.map(|key| key.key);
        let second = repository.select_pool_key().await?.map(|key| key.key);

        assert_ne!(first, second);

        Ok(())
    }
}
