use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{generate_id, BlobRef, Record, ValidationError, ValidationResult};

/// A garage listed on the marketplace, with its services and images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garage {
    pub id: String,
    pub zone: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub main_image: Option<BlobRef>,
    #[serde(default)]
    pub gallery_images: Vec<BlobRef>,
    #[serde(default)]
    pub services: Vec<Service>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A service offered by a garage. Owned by the garage, identified only by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<BlobRef>,
}

/// Client-supplied service entry from the `GarageServices` JSON field
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(alias = "ServiceName")]
    pub name: String,
    #[serde(alias = "ServicePrice", deserialize_with = "number_or_numeric_string")]
    pub price: Decimal,
    #[serde(default, alias = "ServiceImage")]
    pub image: Option<BlobRef>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
            image: None,
        }
    }

    /// Parse the JSON-encoded ordered service list. A missing or blank field is an empty list.
    pub fn parse_list(raw: Option<&str>) -> ValidationResult<Vec<ServiceDescriptor>> {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(Vec::new()),
        };

        let mut descriptors: Vec<ServiceDescriptor> =
            serde_json::from_str(raw).map_err(|e| ValidationError::InvalidFormat {
                field: "GarageServices".to_string(),
                expected: format!("JSON array of {{name, price, image?}} objects ({})", e),
            })?;

        for (index, descriptor) in descriptors.iter_mut().enumerate() {
            descriptor.name = descriptor.name.trim().to_string();
            if descriptor.name.is_empty() {
                return Err(ValidationError::RequiredField {
                    field: format!("GarageServices[{}].name", index),
                });
            }
            if descriptor.price < Decimal::ZERO {
                return Err(ValidationError::InvalidValue {
                    field: format!("GarageServices[{}].price", index),
                    value: descriptor.price.to_string(),
                    reason: "Price cannot be negative".to_string(),
                });
            }
            if descriptor.image.as_ref().is_some_and(BlobRef::is_empty) {
                descriptor.image = None;
            }
        }

        Ok(descriptors)
    }
}

/// Form-built clients send prices either as JSON numbers or as strings like `"29.99"`
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
        Text(String),
    }

    match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(price) => Ok(price),
        RawPrice::Text(text) => text
            .trim()
            .parse::<Decimal>()
            .map_err(|_| de::Error::custom(format!("invalid price {:?}", text))),
    }
}

/// Scalar fields for a new garage
#[derive(Debug, Clone, Default)]
pub struct NewGarage {
    pub zone: String,
    pub name: String,
    pub location: String,
    pub services: Vec<ServiceDescriptor>,
}

/// Partial update of a garage. `None` (or blank) keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct GaragePatch {
    pub zone: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    /// `Some` replaces the whole service list
    pub services: Option<Vec<ServiceDescriptor>>,
}

/// Garage as returned by the API, with public URLs resolved for every image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GarageResponse {
    #[serde(flatten)]
    pub garage: Garage,
    pub main_image_url: Option<String>,
    pub gallery_image_urls: Vec<String>,
    pub service_image_urls: Vec<Option<String>>,
}

impl Garage {
    pub fn new(zone: String, name: String, location: String) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id('G'),
            zone,
            name,
            location,
            main_image: None,
            gallery_images: Vec::new(),
            services: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Every blob this garage references: main image, gallery, service images
    pub fn blob_refs(&self) -> Vec<BlobRef> {
        self.main_image
            .iter()
            .chain(self.gallery_images.iter())
            .chain(self.services.iter().filter_map(|s| s.image.as_ref()))
            .cloned()
            .collect()
    }

    pub fn to_response<F>(&self, url_for: F) -> GarageResponse
    where
        F: Fn(&BlobRef) -> String,
    {
        GarageResponse {
            main_image_url: self.main_image.as_ref().map(&url_for),
            gallery_image_urls: self.gallery_images.iter().map(&url_for).collect(),
            service_image_urls: self
                .services
                .iter()
                .map(|s| s.image.as_ref().map(&url_for))
                .collect(),
            garage: self.clone(),
        }
    }
}

impl Record for Garage {
    const COLLECTION: &'static str = "garages";
    const ENTITY: &'static str = "Garage";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_list_accepts_both_field_spellings() {
        let raw = r#"[{"name":"Oil Change","price":29.99},{"ServiceName":"Wash","ServicePrice":10,"ServiceImage":"uploads/w.png"}]"#;
        let parsed = ServiceDescriptor::parse_list(Some(raw)).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Oil Change");
        assert_eq!(parsed[0].price, dec!(29.99));
        assert_eq!(parsed[0].image, None);
        assert_eq!(parsed[1].name, "Wash");
        assert_eq!(parsed[1].image, Some(BlobRef::new("uploads/w.png")));
    }

    #[test]
    fn test_parse_list_accepts_string_prices() {
        let raw = r#"[{"ServiceName":"Oil Change","ServicePrice":"29.99"},{"name":"Wash","price":" 10 "}]"#;
        let parsed = ServiceDescriptor::parse_list(Some(raw)).unwrap();

        assert_eq!(parsed[0].price, dec!(29.99));
        assert_eq!(parsed[1].price, dec!(10));

        assert!(matches!(
            ServiceDescriptor::parse_list(Some(r#"[{"name":"Wash","price":"ten"}]"#)),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_parse_list_missing_is_empty() {
        assert!(ServiceDescriptor::parse_list(None).unwrap().is_empty());
        assert!(ServiceDescriptor::parse_list(Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_rejects_malformed() {
        assert!(matches!(
            ServiceDescriptor::parse_list(Some("{not json")),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            ServiceDescriptor::parse_list(Some(r#"[{"name":"","price":1}]"#)),
            Err(ValidationError::RequiredField { .. })
        ));
        assert!(matches!(
            ServiceDescriptor::parse_list(Some(r#"[{"name":"x","price":-1}]"#)),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_blob_refs_collects_every_slot() {
        let mut garage = Garage::new("north".into(), "Joe's".into(), "Main St".into());
        garage.main_image = Some("uploads/main.png".into());
        garage.gallery_images = vec!["uploads/g1.png".into(), "uploads/g2.png".into()];
        garage.services = vec![
            Service {
                name: "Oil".into(),
                price: dec!(1),
                image: Some("uploads/s0.png".into()),
            },
            Service {
                name: "Wash".into(),
                price: dec!(2),
                image: None,
            },
        ];

        let refs = garage.blob_refs();
        assert_eq!(refs.len(), 4);
        assert!(refs.contains(&BlobRef::new("uploads/s0.png")));
    }

    #[test]
    fn test_garage_json_shape() {
        let mut garage = Garage::new("north".into(), "Joe's".into(), "Main St".into());
        garage.services.push(Service {
            name: "Oil Change".into(),
            price: dec!(29.99),
            image: None,
        });

        let json = serde_json::to_value(garage.to_response(|r| format!("/{}", r))).unwrap();
        assert_eq!(json["name"], "Joe's");
        assert_eq!(json["services"][0]["price"], 29.99);
        assert!(json["mainImage"].is_null());
        assert!(json["createdAt"].is_string());
        assert_eq!(json["serviceImageUrls"][0], serde_json::Value::Null);
    }
}
