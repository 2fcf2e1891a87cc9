use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::models::{RepositoryError, RepositoryResult};

pub type Item = HashMap<String, AttributeValue>;

/// Convert any serializable record into a DynamoDB item.
/// The record must serialize to a JSON object.
pub fn to_item<T: Serialize>(record: &T) -> RepositoryResult<Item> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, to_attribute(value)))
            .collect()),
        other => Err(RepositoryError::InvalidQuery {
            message: format!("Record must serialize to an object, got {}", other),
        }),
    }
}

/// Convert a DynamoDB item back into a record
pub fn from_item<T: DeserializeOwned>(item: Item) -> RepositoryResult<T> {
    let map = item
        .into_iter()
        .map(|(key, value)| Ok((key, from_attribute(value)?)))
        .collect::<RepositoryResult<Map<String, Value>>>()?;
    Ok(serde_json::from_value(Value::Object(map))?)
}

pub fn to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.into_iter()
                .map(|(key, value)| (key, to_attribute(value)))
                .collect(),
        ),
    }
}

pub fn from_attribute(value: AttributeValue) -> RepositoryResult<Value> {
    Ok(match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::L(items) => Value::Array(
            items
                .into_iter()
                .map(from_attribute)
                .collect::<RepositoryResult<Vec<_>>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| Ok((key, from_attribute(value)?)))
                .collect::<RepositoryResult<Map<String, Value>>>()?,
        ),
        AttributeValue::Ss(items) => {
            Value::Array(items.into_iter().map(Value::String).collect())
        }
        other => {
            return Err(RepositoryError::InvalidQuery {
                message: format!("Unsupported attribute type: {:?}", other),
            })
        }
    })
}

fn parse_number(raw: &str) -> RepositoryResult<Number> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Number::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| RepositoryError::InvalidQuery {
            message: format!("Invalid numeric attribute: {}", raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Garage, Service};
    use rust_decimal_macros::dec;

    #[test]
    fn test_garage_item_shape() {
        let mut garage = Garage::new("north".into(), "Joe's".into(), "Main St".into());
        garage.services.push(Service {
            name: "Oil Change".into(),
            price: dec!(29.99),
            image: Some("uploads/s0.png".into()),
        });

        let item = to_item(&garage).unwrap();
        assert_eq!(item.get("id"), Some(&AttributeValue::S(garage.id.clone())));
        assert_eq!(item.get("mainImage"), Some(&AttributeValue::Null(true)));
        match item.get("services") {
            Some(AttributeValue::L(services)) => match &services[0] {
                AttributeValue::M(service) => {
                    assert_eq!(service.get("price"), Some(&AttributeValue::N("29.99".into())));
                }
                other => panic!("expected map, got {:?}", other),
            },
            other => panic!("expected list, got {:?}", other),
        }

        let restored: Garage = from_item(item).unwrap();
        assert_eq!(restored, garage);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        assert!(from_attribute(AttributeValue::N("abc".into())).is_err());
        assert_eq!(
            from_attribute(AttributeValue::N("42".into())).unwrap(),
            Value::from(42)
        );
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        assert!(to_item(&"just a string").is_err());
    }
}
