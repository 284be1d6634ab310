//! Instalment maths

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::CollectionError;
use crate::fee;
use crate::money::{self, MinorUnits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

/// Upper bound on instalments per loan (ten years of monthly collections)
pub const MAX_INSTALMENTS: u32 = 120;

/// What the borrower asked for. Immutable once a collection request exists.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingRequest {
    borrower_address: String,
    requested_amount: Decimal,
    currency: String,
    instalment_count: u32,
    frequency: Frequency,
}

impl FundingRequest {
    pub fn new(
        borrower_address: &str,
        requested_amount: Decimal,
        currency: &str,
        instalment_count: u32,
        frequency: Frequency,
    ) -> Result<Self, CollectionError> {
        if borrower_address.trim().is_empty() {
            return Err(CollectionError::InvalidRequest(
                "borrower wallet address is required".to_string(),
            ));
        }
        if currency.trim().is_empty() {
            return Err(CollectionError::InvalidRequest(
                "currency is required".to_string(),
            ));
        }
        check_instalment_count(instalment_count)?;
        if requested_amount <= Decimal::ZERO {
            return Err(CollectionError::Money(money::MoneyError::InvalidAmount));
        }
        Ok(Self {
            borrower_address: borrower_address.trim().to_string(),
            requested_amount,
            currency: currency.trim().to_uppercase(),
            instalment_count,
            frequency,
        })
    }

    pub fn borrower_address(&self) -> &str {
        &self.borrower_address
    }

    pub fn requested_amount(&self) -> Decimal {
        self.requested_amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn instalment_count(&self) -> u32 {
        self.instalment_count
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }
}

fn check_instalment_count(instalment_count: u32) -> Result<(), CollectionError> {
    if instalment_count == 0 {
        return Err(CollectionError::InvalidRequest(
            "at least one instalment is required".to_string(),
        ));
    }
    if instalment_count > MAX_INSTALMENTS {
        return Err(CollectionError::InvalidRequest(format!(
            "at most {} instalments are allowed",
            MAX_INSTALMENTS
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchedule {
    /// Set once the provider accepted the billing request
    pub collection_request_id: Option<String>,
    pub currency: String,
    pub total_amount: MinorUnits,
    pub instalments: Vec<MinorUnits>,
    pub frequency: Frequency,
}

/// Split `amount` into `instalment_count` floor-divided shares.
///
/// The remainder goes to the last instalment, so the shares always sum to
/// `round(amount * 100)`.
pub fn build_schedule(
    amount: Decimal,
    instalment_count: u32,
    frequency: Frequency,
) -> Result<CollectionSchedule, CollectionError> {
    check_instalment_count(instalment_count)?;
    let total = money::to_minor_units(amount)?;
    let count = instalment_count as u64;
    let share = total / count;
    let remainder = total % count;

    let mut instalments = vec![share; instalment_count as usize];
    if let Some(last) = instalments.last_mut() {
        *last += remainder;
    }

    Ok(CollectionSchedule {
        collection_request_id: None,
        currency: String::new(),
        total_amount: total,
        instalments,
        frequency,
    })
}

/// Schedule for a funding request, collection surcharge included.
pub fn schedule_for(request: &FundingRequest) -> Result<CollectionSchedule, CollectionError> {
    let gross = fee::apply_surcharge(request.requested_amount());
    let mut schedule = build_schedule(gross, request.instalment_count(), request.frequency())?;
    schedule.currency = request.currency().to_string();
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_remainder_goes_to_last_instalment() {
        let schedule = build_schedule(d("10.00"), 3, Frequency::Weekly).unwrap();
        assert_eq!(schedule.instalments, vec![333, 333, 334]);
        assert_eq!(schedule.total_amount, 1000);
    }

    #[test]
    fn test_single_instalment_takes_everything() {
        let schedule = build_schedule(d("2.20"), 1, Frequency::Monthly).unwrap();
        assert_eq!(schedule.instalments, vec![220]);
    }

    #[test]
    fn test_more_instalments_than_cents() {
        let schedule = build_schedule(d("0.03"), 5, Frequency::Weekly).unwrap();
        assert_eq!(schedule.instalments, vec![0, 0, 0, 0, 3]);
    }

    #[test]
    fn test_instalments_always_sum_to_total() {
        let amounts = ["0.01", "1.00", "9.99", "10.005", "123.45", "1000", "99999.99"];
        for amount in amounts {
            for count in 1..=12u32 {
                let schedule = build_schedule(d(amount), count, Frequency::Monthly).unwrap();
                let expected = money::to_minor_units(d(amount)).unwrap();
                assert_eq!(schedule.instalments.len(), count as usize);
                assert_eq!(
                    schedule.instalments.iter().sum::<u64>(),
                    expected,
                    "amount={} count={}",
                    amount,
                    count
                );
                assert!(schedule.instalments.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn test_rejects_zero_count_and_non_positive_amount() {
        assert!(matches!(
            build_schedule(d("10"), 0, Frequency::Weekly),
            Err(CollectionError::InvalidRequest(_))
        ));
        assert!(matches!(
            build_schedule(Decimal::ZERO, 3, Frequency::Weekly),
            Err(CollectionError::Money(_))
        ));
    }

    #[test]
    fn test_instalment_count_is_bounded() {
        assert!(
            FundingRequest::new("0xabc", d("10"), "USD", MAX_INSTALMENTS, Frequency::Weekly)
                .is_ok()
        );
        for count in [MAX_INSTALMENTS + 1, u32::MAX] {
            assert!(matches!(
                FundingRequest::new("0xabc", d("10"), "USD", count, Frequency::Weekly),
                Err(CollectionError::InvalidRequest(_))
            ));
            assert!(matches!(
                build_schedule(d("10"), count, Frequency::Weekly),
                Err(CollectionError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_schedule_for_applies_surcharge_once() {
        let request =
            FundingRequest::new("0xabc", d("10.00"), "usd", 3, Frequency::Weekly).unwrap();
        let schedule = schedule_for(&request).unwrap();

        assert_eq!(schedule.total_amount, 1100);
        assert_eq!(schedule.instalments, vec![366, 366, 368]);
        assert_eq!(schedule.currency, "USD");
    }

    #[test]
    fn test_funding_request_validation() {
        assert!(FundingRequest::new("", d("1"), "USD", 1, Frequency::Weekly).is_err());
        assert!(FundingRequest::new("0xabc", d("1"), "USD", 0, Frequency::Weekly).is_err());
        assert!(FundingRequest::new("0xabc", d("-1"), "USD", 1, Frequency::Weekly).is_err());
        assert!(FundingRequest::new("0xabc", d("1"), " ", 1, Frequency::Weekly).is_err());
    }

    #[test]
    fn test_frequency_wire_format() {
        assert_eq!(serde_json::to_string(&Frequency::Weekly).unwrap(), "\"weekly\"");
        let parsed: Frequency = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(parsed, Frequency::Monthly);
    }
}
