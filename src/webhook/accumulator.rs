//! Per-delivery instalment accumulator

use uuid::Uuid;

use crate::money::{MinorUnits, MoneyError};

const BATCH_NAMESPACE: Uuid = Uuid::from_u128(0x2f8e_51c3_97a0_4d6b_b1e2_5c7d_08f4_a396);

/// Amounts accrued under one correlation key within a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccruedEntry {
    pub correlation_id: Option<String>,
    pub total: MinorUnits,
    pub event_ids: Vec<String>,
}

impl AccruedEntry {
    /// Stable across redeliveries of the same events, whatever their order.
    pub fn batch_key(&self) -> String {
        let mut ids: Vec<&str> = self.event_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids.dedup();
        Uuid::new_v5(&BATCH_NAMESPACE, ids.join("\n").as_bytes()).to_string()
    }
}

/// Lives for exactly one delivery; never shared.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    entries: Vec<AccruedEntry>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        correlation_id: Option<String>,
        event_id: &str,
        amount: MinorUnits,
    ) -> Result<(), MoneyError> {
        match self
            .entries
            .iter_mut()
            .find(|e| e.correlation_id == correlation_id)
        {
            Some(entry) => {
                entry.total = entry.total.checked_add(amount).ok_or(MoneyError::Overflow)?;
                entry.event_ids.push(event_id.to_string());
            }
            None => self.entries.push(AccruedEntry {
                correlation_id,
                total: amount,
                event_ids: vec![event_id.to_string()],
            }),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.total == 0)
    }

    /// Non-zero entries in order of first appearance
    pub fn into_entries(self) -> Vec<AccruedEntry> {
        self.entries.into_iter().filter(|e| e.total > 0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_accumulates() {
        let mut acc = BatchAccumulator::new();
        acc.add(Some("c-1".into()), "EV1", 500).unwrap();
        acc.add(Some("c-1".into()), "EV2", 700).unwrap();

        let entries = acc.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].total, 1200);
        assert_eq!(entries[0].event_ids, vec!["EV1", "EV2"]);
    }

    #[test]
    fn test_keys_are_kept_apart() {
        let mut acc = BatchAccumulator::new();
        acc.add(Some("c-1".into()), "EV1", 500).unwrap();
        acc.add(Some("c-2".into()), "EV2", 700).unwrap();
        acc.add(None, "EV3", 100).unwrap();

        let entries = acc.into_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].correlation_id, None);
    }

    #[test]
    fn test_zero_amounts_do_not_fund() {
        let mut acc = BatchAccumulator::new();
        acc.add(Some("c-1".into()), "EV1", 0).unwrap();
        assert!(acc.is_empty());
        assert!(acc.into_entries().is_empty());
    }

    #[test]
    fn test_batch_key_ignores_event_order() {
        let a = AccruedEntry {
            correlation_id: None,
            total: 1,
            event_ids: vec!["EV2".into(), "EV1".into()],
        };
        let b = AccruedEntry {
            event_ids: vec!["EV1".into(), "EV2".into()],
            ..a.clone()
        };
        let c = AccruedEntry {
            event_ids: vec!["EV1".into(), "EV3".into()],
            ..a.clone()
        };
        assert_eq!(a.batch_key(), b.batch_key());
        assert_ne!(a.batch_key(), c.batch_key());
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut acc = BatchAccumulator::new();
        acc.add(None, "EV1", u64::MAX).unwrap();
        assert_eq!(acc.add(None, "EV2", 1), Err(MoneyError::Overflow));
    }
}
