//! Domain types for ledger operations.

use serde::{Deserialize, Serialize};

/// Largest amount a single operation may move, in medals.
pub const MAX_TRANSACTION_AMOUNT: i64 = 100_000;

/// The two kinds of ledger mutation. Closed set; nothing else is ever
/// written to the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Medals added to a balance.
    Deposit,
    /// Medals paid out of a balance.
    Withdraw,
}

impl TransactionKind {
    /// Wire representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }

    /// Parses the wire representation, returning `None` for anything
    /// outside the closed set.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(Self::Deposit),
            "withdraw" => Some(Self::Withdraw),
            _ => None,
        }
    }

    /// Sign of this kind's effect on a balance: +1 or -1.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Deposit => 1,
            Self::Withdraw => -1,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        assert_eq!(
            TransactionKind::parse("deposit"),
            Some(TransactionKind::Deposit)
        );
        assert_eq!(
            TransactionKind::parse("withdraw"),
            Some(TransactionKind::Withdraw)
        );
        assert_eq!(TransactionKind::parse("transfer"), None);
        assert_eq!(TransactionKind::parse("DEPOSIT"), None);
        assert_eq!(TransactionKind::Deposit.as_str(), "deposit");
        assert_eq!(TransactionKind::Withdraw.as_str(), "withdraw");
    }

    #[test]
    fn test_sign() {
        assert_eq!(TransactionKind::Deposit.sign(), 1);
        assert_eq!(TransactionKind::Withdraw.sign(), -1);
    }
}
