use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::CanonicalKey;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceEntryId(pub Uuid);

/// Learned pricing knowledge for one canonical service type.
///
/// The learning rule is deliberately confined to `first_observation` and
/// `observe` so it can be swapped (e.g. for a weighted average) without
/// touching the reconciliation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBookEntry {
    pub id: PriceEntryId,
    pub service_type: String,
    pub canonical_type: CanonicalKey,
    pub service_type_es: Option<String>,
    pub default_price: Decimal,
    pub times_used: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceBookEntry {
    pub fn first_observation(service_type: &str, price: Decimal) -> Result<Self, DomainError> {
        if price.is_sign_negative() {
            return Err(DomainError::NegativePrice(price));
        }
        if price.is_zero() {
            return Err(DomainError::UnusablePriceObservation(price));
        }
        let now = Utc::now();
        Ok(Self {
            id: PriceEntryId(Uuid::new_v4()),
            service_type: service_type.trim().to_string(),
            canonical_type: CanonicalKey::new(service_type),
            service_type_es: None,
            default_price: price.round_dp(2),
            times_used: 1,
            notes: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Most-recent-wins: the latest quote is the most trustworthy signal of
    /// current pricing. Zero or negative observations never overwrite the
    /// learned price.
    pub fn observe(&mut self, price: Decimal) -> Result<(), DomainError> {
        if price.is_sign_negative() {
            return Err(DomainError::NegativePrice(price));
        }
        if price.is_zero() {
            return Err(DomainError::UnusablePriceObservation(price));
        }
        self.default_price = price.round_dp(2);
        self.times_used += 1;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::PriceBookEntry;
    use crate::canonical::CanonicalKey;
    use crate::errors::DomainError;

    #[test]
    fn first_observation_starts_with_one_use() {
        let entry = PriceBookEntry::first_observation("Tree trimming", Decimal::new(12000, 2))
            .expect("first observation");
        assert_eq!(entry.canonical_type, CanonicalKey::new("tree trimming"));
        assert_eq!(entry.default_price, Decimal::new(12000, 2));
        assert_eq!(entry.times_used, 1);
    }

    #[test]
    fn latest_observation_wins() {
        let mut entry = PriceBookEntry::first_observation("Tree trimming", Decimal::new(12000, 2))
            .expect("first observation");
        entry.observe(Decimal::new(15000, 2)).expect("second observation");
        entry.observe(Decimal::new(13500, 2)).expect("third observation");

        assert_eq!(entry.default_price, Decimal::new(13500, 2));
        assert_eq!(entry.times_used, 3);
    }

    #[test]
    fn observations_round_to_cents() {
        let mut entry = PriceBookEntry::first_observation("Weeding", Decimal::new(50, 0))
            .expect("first observation");
        entry.observe(Decimal::new(49999, 3)).expect("observe");
        assert_eq!(entry.default_price, Decimal::new(5000, 2));
    }

    #[test]
    fn zero_observation_never_overwrites() {
        let mut entry = PriceBookEntry::first_observation("Weeding", Decimal::new(5000, 2))
            .expect("first observation");
        let error = entry.observe(Decimal::ZERO).expect_err("zero price");
        assert_eq!(error, DomainError::UnusablePriceObservation(Decimal::ZERO));
        assert_eq!(entry.default_price, Decimal::new(5000, 2));
        assert_eq!(entry.times_used, 1);
    }

    #[test]
    fn zero_first_observation_is_rejected() {
        let error = PriceBookEntry::first_observation("Weeding", Decimal::ZERO)
            .expect_err("zero price");
        assert_eq!(error, DomainError::UnusablePriceObservation(Decimal::ZERO));
    }

    #[test]
    fn negative_price_is_rejected() {
        let error = PriceBookEntry::first_observation("Weeding", Decimal::new(-100, 2))
            .expect_err("negative price");
        assert!(matches!(error, DomainError::NegativePrice(_)));
    }
}
