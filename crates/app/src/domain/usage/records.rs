//! Usage Records

use jiff::civil::Date;

use crate::domain::tokens::records::TokenUuid;

/// Status class a recorded response is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
    Other,
}

impl StatusClass {
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400..=499 => Self::ClientError,
            500.. => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Per-class increments as `(2xx, 4xx, 5xx)`.
    #[must_use]
    pub const fn increments(self) -> (i64, i64, i64) {
        match self {
            Self::Success => (1, 0, 0),
            Self::ClientError => (0, 1, 0),
            Self::ServerError => (0, 0, 1),
            Self::Other => (0, 0, 0),
        }
    }
}

/// Request counters, summed over any span of days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub total: i64,
    pub status_2xx: i64,
    pub status_4xx: i64,
    pub status_5xx: i64,
}

impl UsageTotals {
    /// Add one request of the given class.
    pub fn record(&mut self, class: StatusClass) {
        let (success, client, server) = class.increments();

        self.total += 1;
        self.status_2xx += success;
        self.status_4xx += client;
        self.status_5xx += server;
    }
}

/// One UTC calendar day of usage for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyUsage {
    pub date: Date,
    pub totals: UsageTotals,
}

/// All-time usage for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsageTotals {
    pub token: TokenUuid,
    pub totals: UsageTotals,
}
