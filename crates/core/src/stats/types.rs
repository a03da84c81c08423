//! Statistics domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::ledger::TransactionKind;

/// Minimal view of a transaction row, as statistics input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Deposit or withdraw.
    pub kind: TransactionKind,
    /// Amount in medals.
    pub amount: i64,
    /// When the transaction was written.
    pub created_at: DateTime<Utc>,
}

/// Aggregation period for user statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsPeriod {
    /// Last 7 days.
    SevenDays,
    /// Last 30 days.
    ThirtyDays,
    /// Last 90 days.
    NinetyDays,
    /// No date filter.
    All,
}

impl StatsPeriod {
    /// Parses the wire representation ("7d", "30d", "90d", "all").
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "7d" => Some(Self::SevenDays),
            "30d" => Some(Self::ThirtyDays),
            "90d" => Some(Self::NinetyDays),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Wire representation of the period.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::NinetyDays => "90d",
            Self::All => "all",
        }
    }

    /// Window length in days; `None` means no date filter.
    #[must_use]
    pub const fn days(self) -> Option<i64> {
        match self {
            Self::SevenDays => Some(7),
            Self::ThirtyDays => Some(30),
            Self::NinetyDays => Some(90),
            Self::All => None,
        }
    }
}

/// Deposit/withdraw totals and counts over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTotals {
    /// Sum of deposit amounts.
    pub total_deposits: i64,
    /// Sum of withdrawal amounts.
    pub total_withdraws: i64,
    /// Deposits minus withdrawals.
    pub net_change: i64,
    /// Number of transactions of either kind.
    pub transaction_count: u64,
    /// Number of deposits.
    pub deposit_count: u64,
    /// Number of withdrawals.
    pub withdraw_count: u64,
}

/// One calendar day's activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    /// The calendar day (UTC).
    pub date: NaiveDate,
    /// Sum of deposits that day.
    pub deposits: i64,
    /// Sum of withdrawals that day.
    pub withdraws: i64,
    /// Number of transactions that day.
    pub transactions: u64,
    /// Deposits minus withdrawals that day.
    pub net_change: i64,
}

/// Full per-period statistics for one user.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodStats {
    /// Totals and counts by kind.
    #[serde(flatten)]
    pub totals: ActivityTotals,
    /// Average transaction amount, rounded to whole medals.
    pub avg_transaction: i64,
    /// Largest single deposit (0 when there were none).
    pub largest_deposit: i64,
    /// Largest single withdrawal (0 when there were none).
    pub largest_withdraw: i64,
    /// Timestamp of the earliest transaction in the period.
    pub first_transaction: Option<DateTime<Utc>>,
    /// Timestamp of the latest transaction in the period.
    pub last_transaction: Option<DateTime<Utc>>,
    /// One row per calendar day with activity, newest day first.
    pub daily_breakdown: Vec<DailyActivity>,
}

/// Overall direction of a trend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Mean daily net change above +10 medals.
    Increasing,
    /// Mean daily net change below -10 medals.
    Decreasing,
    /// Anything in between.
    Stable,
}

impl TrendDirection {
    /// Wire representation of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Time-series analysis of a user's activity.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    /// Number of calendar days with activity.
    pub data_points: usize,
    /// Daily activity, oldest day first.
    pub daily: Vec<DailyActivity>,
    /// Overall direction of the window.
    pub overall_trend: TrendDirection,
    /// Mean daily net change, rounded to whole medals.
    pub avg_daily_net: i64,
    /// Day with the most transactions, if any.
    pub most_active_day: Option<DailyActivity>,
}
