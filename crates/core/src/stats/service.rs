//! Statistics computation over fetched transaction rows.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::types::{
    ActivityTotals, DailyActivity, PeriodStats, TransactionRecord, TrendDirection, TrendReport,
};
use crate::ledger::TransactionKind;

/// Mean daily net change above which a window counts as increasing.
const TREND_THRESHOLD: i64 = 10;

/// Computes deposit/withdraw totals and counts.
#[must_use]
pub fn totals(rows: &[TransactionRecord]) -> ActivityTotals {
    let mut acc = ActivityTotals::default();

    for row in rows {
        acc.transaction_count += 1;
        match row.kind {
            TransactionKind::Deposit => {
                acc.total_deposits += row.amount;
                acc.deposit_count += 1;
            }
            TransactionKind::Withdraw => {
                acc.total_withdraws += row.amount;
                acc.withdraw_count += 1;
            }
        }
    }

    acc.net_change = acc.total_deposits - acc.total_withdraws;
    acc
}

/// Computes full per-period statistics: totals, extremes, average amount,
/// first/last timestamps, and a daily breakdown (newest day first).
#[must_use]
pub fn summarize(rows: &[TransactionRecord]) -> PeriodStats {
    let totals = totals(rows);

    let amount_sum: i64 = rows.iter().map(|r| r.amount).sum();
    let count = i64::try_from(totals.transaction_count).unwrap_or(i64::MAX);
    let avg_transaction = if count > 0 {
        div_round(amount_sum, count)
    } else {
        0
    };

    let largest_deposit = rows
        .iter()
        .filter(|r| r.kind == TransactionKind::Deposit)
        .map(|r| r.amount)
        .max()
        .unwrap_or(0);
    let largest_withdraw = rows
        .iter()
        .filter(|r| r.kind == TransactionKind::Withdraw)
        .map(|r| r.amount)
        .max()
        .unwrap_or(0);

    let first_transaction = rows.iter().map(|r| r.created_at).min();
    let last_transaction = rows.iter().map(|r| r.created_at).max();

    // BTreeMap iterates ascending; the breakdown wants newest first.
    let daily_breakdown = daily_buckets(rows).into_values().rev().collect();

    PeriodStats {
        totals,
        avg_transaction,
        largest_deposit,
        largest_withdraw,
        first_transaction,
        last_transaction,
        daily_breakdown,
    }
}

/// Analyzes the daily time series: per-day activity ascending, an overall
/// direction from the mean daily net change, and the most active day.
#[must_use]
pub fn analyze_trend(rows: &[TransactionRecord]) -> TrendReport {
    let daily: Vec<DailyActivity> = daily_buckets(rows).into_values().collect();
    let data_points = daily.len();

    let avg_daily_net = if data_points > 0 {
        let net_sum: i64 = daily.iter().map(|d| d.net_change).sum();
        div_round(net_sum, i64::try_from(data_points).unwrap_or(i64::MAX))
    } else {
        0
    };

    let overall_trend = if avg_daily_net > TREND_THRESHOLD {
        TrendDirection::Increasing
    } else if avg_daily_net < -TREND_THRESHOLD {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    // On ties the earliest day wins, so compare strictly.
    let most_active_day = daily
        .iter()
        .fold(None::<DailyActivity>, |best, day| match best {
            Some(b) if day.transactions > b.transactions => Some(*day),
            Some(b) => Some(b),
            None => Some(*day),
        });

    TrendReport {
        data_points,
        daily,
        overall_trend,
        avg_daily_net,
        most_active_day,
    }
}

/// Buckets rows by UTC calendar day, ascending.
fn daily_buckets(rows: &[TransactionRecord]) -> BTreeMap<NaiveDate, DailyActivity> {
    let mut buckets: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();

    for row in rows {
        let date = row.created_at.date_naive();
        let entry = buckets.entry(date).or_insert(DailyActivity {
            date,
            deposits: 0,
            withdraws: 0,
            transactions: 0,
            net_change: 0,
        });

        entry.transactions += 1;
        match row.kind {
            TransactionKind::Deposit => entry.deposits += row.amount,
            TransactionKind::Withdraw => entry.withdraws += row.amount,
        }
        entry.net_change = entry.deposits - entry.withdraws;
    }

    buckets
}

/// Integer division rounded half away from zero.
fn div_round(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}
