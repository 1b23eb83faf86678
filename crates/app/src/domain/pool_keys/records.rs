//! Pool Key Records

use std::fmt;

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Pool Key UUID
pub type PoolKeyUuid = TypedUuid<PoolKeyRecord>;

/// An upstream credential shared by every tenant.
#[derive(Clone, PartialEq)]
pub struct PoolKeyRecord {
    pub uuid: PoolKeyUuid,

    /// Upstream secret. Never rendered in debug output.
    pub key: String,

    pub alias: String,
    pub total_quota: i32,
    pub used_quota: i32,
    pub is_active: bool,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl fmt::Debug for PoolKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolKeyRecord")
            .field("uuid", &self.uuid)
            .field("key", &"**redacted**")
            .field("alias", &self.alias)
            .field("total_quota", &self.total_quota)
            .field("used_quota", &self.used_quota)
            .field("is_active", &self.is_active)
            .field("last_used_at", &self.last_used_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// New Pool Key Data
#[derive(Clone, PartialEq)]
pub struct NewPoolKey {
    pub uuid: PoolKeyUuid,
    pub key: String,
    pub alias: String,
    pub total_quota: i32,
}

impl fmt::Debug for NewPoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewPoolKey")
            .field("uuid", &self.uuid)
            .field("alias", &self.alias)
            .field("total_quota", &self.total_quota)
            .finish_non_exhaustive()
    }
}
