//! Transaction statistics and trend analysis.
//!
//! Pure aggregation over transaction rows fetched for a period window:
//! totals and counts by kind, daily breakdowns, and a simple overall-trend
//! classification. Callers fetch the rows; everything here is arithmetic.

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::{analyze_trend, summarize, totals};
pub use types::{
    ActivityTotals, DailyActivity, PeriodStats, StatsPeriod, TransactionRecord, TrendDirection,
    TrendReport,
};
