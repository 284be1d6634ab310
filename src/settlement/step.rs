//! Settlement step identifiers
//!
//! Step names are stored in the ledger's `step` column.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementStep {
    /// Inbound wire to the business account
    WireDeposit,
    /// Deposit bound to the wire that produced it; keyed by deposit id
    DepositMatch,
    /// Business account -> operating wallet payout
    RecipientTransfer,
    /// `requestFundingForBorrower` contract call
    FundingRequest,
    /// `repayAmountForLoan` contract call
    Repayment,
}

impl SettlementStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStep::WireDeposit => "WIRE_DEPOSIT",
            SettlementStep::DepositMatch => "DEPOSIT_MATCH",
            SettlementStep::RecipientTransfer => "RECIPIENT_TRANSFER",
            SettlementStep::FundingRequest => "FUNDING_REQUEST",
            SettlementStep::Repayment => "REPAYMENT",
        }
    }
}

impl fmt::Display for SettlementStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_fit_ledger_column() {
        let steps = [
            SettlementStep::WireDeposit,
            SettlementStep::DepositMatch,
            SettlementStep::RecipientTransfer,
            SettlementStep::FundingRequest,
            SettlementStep::Repayment,
        ];
        let names: std::collections::HashSet<_> = steps.iter().map(|s| s.as_str()).collect();
        assert_eq!(names.len(), steps.len());
        assert!(names.iter().all(|n| n.len() <= 32));
        assert_eq!(SettlementStep::DepositMatch.to_string(), "DEPOSIT_MATCH");
    }
}
