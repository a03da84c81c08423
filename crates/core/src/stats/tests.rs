//! Unit tests for statistics computation.

use chrono::{DateTime, TimeZone, Utc};

use super::service::{analyze_trend, summarize, totals};
use super::types::{StatsPeriod, TransactionRecord, TrendDirection};
use crate::ledger::TransactionKind;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn deposit(amount: i64, day: u32, hour: u32) -> TransactionRecord {
    TransactionRecord {
        kind: TransactionKind::Deposit,
        amount,
        created_at: at(day, hour),
    }
}

fn withdraw(amount: i64, day: u32, hour: u32) -> TransactionRecord {
    TransactionRecord {
        kind: TransactionKind::Withdraw,
        amount,
        created_at: at(day, hour),
    }
}

#[test]
fn test_totals() {
    let rows = vec![
        deposit(500, 1, 9),
        withdraw(200, 1, 12),
        deposit(300, 2, 9),
    ];

    let t = totals(&rows);
    assert_eq!(t.total_deposits, 800);
    assert_eq!(t.total_withdraws, 200);
    assert_eq!(t.net_change, 600);
    assert_eq!(t.transaction_count, 3);
    assert_eq!(t.deposit_count, 2);
    assert_eq!(t.withdraw_count, 1);
}

#[test]
fn test_totals_empty() {
    let t = totals(&[]);
    assert_eq!(t.transaction_count, 0);
    assert_eq!(t.net_change, 0);
}

#[test]
fn test_summarize() {
    let rows = vec![
        deposit(1000, 1, 9),
        withdraw(400, 1, 15),
        deposit(200, 3, 10),
        withdraw(100, 3, 11),
    ];

    let stats = summarize(&rows);
    assert_eq!(stats.totals.total_deposits, 1200);
    assert_eq!(stats.totals.total_withdraws, 500);
    assert_eq!(stats.largest_deposit, 1000);
    assert_eq!(stats.largest_withdraw, 400);
    // (1000 + 400 + 200 + 100) / 4 = 425
    assert_eq!(stats.avg_transaction, 425);
    assert_eq!(stats.first_transaction, Some(at(1, 9)));
    assert_eq!(stats.last_transaction, Some(at(3, 11)));

    // Two active days, newest first.
    assert_eq!(stats.daily_breakdown.len(), 2);
    assert_eq!(stats.daily_breakdown[0].date.to_string(), "2024-03-03");
    assert_eq!(stats.daily_breakdown[0].net_change, 100);
    assert_eq!(stats.daily_breakdown[1].date.to_string(), "2024-03-01");
    assert_eq!(stats.daily_breakdown[1].net_change, 600);
}

#[test]
fn test_summarize_empty() {
    let stats = summarize(&[]);
    assert_eq!(stats.avg_transaction, 0);
    assert_eq!(stats.largest_deposit, 0);
    assert_eq!(stats.largest_withdraw, 0);
    assert_eq!(stats.first_transaction, None);
    assert!(stats.daily_breakdown.is_empty());
}

#[test]
fn test_avg_transaction_rounds() {
    // (100 + 101) / 2 = 100.5 -> 101
    let rows = vec![deposit(100, 1, 9), deposit(101, 1, 10)];
    assert_eq!(summarize(&rows).avg_transaction, 101);
}

#[test]
fn test_trend_increasing() {
    // Two active days, each +100 net: avg +100 > +10.
    let rows = vec![deposit(100, 1, 9), deposit(100, 2, 9)];

    let report = analyze_trend(&rows);
    assert_eq!(report.data_points, 2);
    assert_eq!(report.avg_daily_net, 100);
    assert_eq!(report.overall_trend, TrendDirection::Increasing);
}

#[test]
fn test_trend_decreasing() {
    let rows = vec![withdraw(50, 1, 9), withdraw(80, 2, 9)];

    let report = analyze_trend(&rows);
    assert_eq!(report.avg_daily_net, -65);
    assert_eq!(report.overall_trend, TrendDirection::Decreasing);
}

#[test]
fn test_trend_stable_within_thresholds() {
    // +10 exactly is not "above +10".
    let rows = vec![deposit(10, 1, 9)];
    assert_eq!(analyze_trend(&rows).overall_trend, TrendDirection::Stable);

    let rows = vec![withdraw(10, 1, 9)];
    assert_eq!(analyze_trend(&rows).overall_trend, TrendDirection::Stable);
}

#[test]
fn test_trend_empty() {
    let report = analyze_trend(&[]);
    assert_eq!(report.data_points, 0);
    assert_eq!(report.avg_daily_net, 0);
    assert_eq!(report.overall_trend, TrendDirection::Stable);
    assert!(report.most_active_day.is_none());
}

#[test]
fn test_trend_daily_ascending_and_most_active() {
    let rows = vec![
        deposit(10, 3, 9),
        deposit(10, 1, 9),
        withdraw(5, 1, 10),
        deposit(10, 2, 9),
    ];

    let report = analyze_trend(&rows);
    let dates: Vec<String> = report.daily.iter().map(|d| d.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-03"]);

    // Day 1 has two transactions, the rest one each.
    let busiest = report.most_active_day.unwrap();
    assert_eq!(busiest.date.to_string(), "2024-03-01");
    assert_eq!(busiest.transactions, 2);
}

#[test]
fn test_most_active_day_tie_keeps_earliest() {
    let rows = vec![deposit(10, 2, 9), deposit(10, 1, 9)];
    let report = analyze_trend(&rows);
    assert_eq!(
        report.most_active_day.unwrap().date.to_string(),
        "2024-03-01"
    );
}

#[test]
fn test_period_parse() {
    assert_eq!(StatsPeriod::parse("7d"), Some(StatsPeriod::SevenDays));
    assert_eq!(StatsPeriod::parse("30d"), Some(StatsPeriod::ThirtyDays));
    assert_eq!(StatsPeriod::parse("90d"), Some(StatsPeriod::NinetyDays));
    assert_eq!(StatsPeriod::parse("all"), Some(StatsPeriod::All));
    assert_eq!(StatsPeriod::parse("1y"), None);

    assert_eq!(StatsPeriod::SevenDays.days(), Some(7));
    assert_eq!(StatsPeriod::All.days(), None);
    assert_eq!(StatsPeriod::ThirtyDays.as_str(), "30d");
}
