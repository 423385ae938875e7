use std::fmt;

use geon_types::Amount;
use serde::Serialize;

/// Custody reconciliation of a world at a commit point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustodyAudit {
    /// The registry's balance on the coin.
    pub custody_balance: Amount,
    /// Sum of every Geon's balance; `None` if the sum overflows.
    pub geon_total: Option<Amount>,
    /// The registry's live Geon count.
    pub geon_count: u64,
    /// Geon records actually present in the store.
    pub enumerated: u64,
}

impl CustodyAudit {
    /// Custody matches the Geon balances and the count matches the records.
    pub fn is_balanced(&self) -> bool {
        self.geon_total == Some(self.custody_balance) && self.geon_count == self.enumerated
    }
}

impl fmt::Display for CustodyAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self
            .geon_total
            .map(|total| total.to_string())
            .unwrap_or_else(|| "overflow".into());
        write!(
            f,
            "custody={} geon_total={} count={} enumerated={}",
            self.custody_balance, total, self.geon_count, self.enumerated
        )
    }
}
