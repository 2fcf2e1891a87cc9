use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{generate_id, BlobRef, Record, ValidationError, ValidationResult};

pub const DEFAULT_PAYMENT_STATUS: &str = "Pending";

/// A customer payment for a garage service, evidenced by a QR code screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub name: String,
    pub email: String,
    pub car_model: String,
    pub garage: String,
    pub garage_id: String,
    pub service: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub transaction_id: String,
    pub qr_code_image: BlobRef,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Text fields of a payment form, all optional at the wire level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub car_model: Option<String>,
    pub garage: Option<String>,
    pub garage_id: Option<String>,
    pub service: Option<String>,
    pub price: Option<Decimal>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    #[serde(flatten)]
    pub payment: Payment,
    pub qr_code_image_url: String,
}

impl Payment {
    /// Apply every supplied field; blank strings leave the stored value in place
    pub fn apply(&mut self, fields: PaymentFields) {
        fn merge(target: &mut String, value: Option<String>) {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                *target = value;
            }
        }

        merge(&mut self.name, fields.name);
        merge(&mut self.email, fields.email);
        merge(&mut self.car_model, fields.car_model);
        merge(&mut self.garage, fields.garage);
        merge(&mut self.garage_id, fields.garage_id);
        merge(&mut self.service, fields.service);
        merge(&mut self.transaction_id, fields.transaction_id);
        merge(&mut self.status, fields.status);
        if let Some(price) = fields.price {
            self.price = price;
        }
        self.updated_at = Utc::now();
    }

    /// Build a pending payment; every text field, the price and the QR image are required
    pub fn from_fields(fields: PaymentFields, qr_code_image: BlobRef) -> ValidationResult<Self> {
        fn required(value: Option<String>, field: &str) -> ValidationResult<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ValidationError::RequiredField {
                    field: field.to_string(),
                })
        }

        let price = fields.price.ok_or_else(|| ValidationError::RequiredField {
            field: "price".to_string(),
        })?;
        if price < Decimal::ZERO {
            return Err(ValidationError::InvalidValue {
                field: "price".to_string(),
                value: price.to_string(),
                reason: "Price cannot be negative".to_string(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: generate_id('P'),
            name: required(fields.name, "name")?,
            email: required(fields.email, "email")?,
            car_model: required(fields.car_model, "carModel")?,
            garage: required(fields.garage, "garage")?,
            garage_id: required(fields.garage_id, "garageId")?,
            service: required(fields.service, "service")?,
            price,
            transaction_id: required(fields.transaction_id, "transactionId")?,
            qr_code_image,
            status: DEFAULT_PAYMENT_STATUS.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn to_response<F>(&self, url_for: F) -> PaymentResponse
    where
        F: Fn(&BlobRef) -> String,
    {
        PaymentResponse {
            qr_code_image_url: url_for(&self.qr_code_image),
            payment: self.clone(),
        }
    }
}

impl Record for Payment {
    const COLLECTION: &'static str = "payments";
    const ENTITY: &'static str = "Payment";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
