use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub Uuid);

/// One performed (or agreed) piece of extra work for a client, billed
/// outside the maintenance package. Invoicing is an external collaborator;
/// the engine only records the flag and reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: ServiceId,
    pub client_id: ClientId,
    pub description: String,
    pub description_es: Option<String>,
    pub price: Decimal,
    pub service_date: NaiveDate,
    pub invoiced: bool,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceRecord {
    pub fn create(
        client_id: ClientId,
        description: &str,
        price: Decimal,
        service_date: NaiveDate,
    ) -> Result<Self, DomainError> {
        if price.is_sign_negative() {
            return Err(DomainError::NegativePrice(price));
        }
        Ok(Self {
            id: ServiceId(Uuid::new_v4()),
            client_id,
            description: description.trim().to_string(),
            description_es: None,
            price: price.round_dp(2),
            service_date,
            invoiced: false,
            invoice_number: None,
            notes: None,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::ServiceRecord;
    use crate::domain::client::ClientId;
    use crate::errors::DomainError;

    #[test]
    fn new_services_start_uninvoiced() {
        let service = ServiceRecord::create(
            ClientId(Uuid::new_v4()),
            " Sprinkler repair ",
            Decimal::new(2500, 2),
            Utc::now().date_naive(),
        )
        .expect("create service");

        assert_eq!(service.description, "Sprinkler repair");
        assert!(!service.invoiced);
        assert!(service.invoice_number.is_none());
    }

    #[test]
    fn negative_price_is_rejected() {
        let error = ServiceRecord::create(
            ClientId(Uuid::new_v4()),
            "Sprinkler repair",
            Decimal::new(-2500, 2),
            Utc::now().date_naive(),
        )
        .expect_err("negative price");
        assert!(matches!(error, DomainError::NegativePrice(_)));
    }
}
