use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{generate_id, Record};

/// A contact-form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub mobile_number: String,
    pub message: String,
    #[serde(default)]
    pub program: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: Option<String>,
    pub mobile_number: Option<String>,
    pub message: Option<String>,
    pub program: Option<String>,
}

impl Contact {
    pub fn new(name: String, mobile_number: String, message: String, program: Option<String>) -> Self {
        Self {
            id: generate_id('C'),
            name,
            mobile_number,
            message,
            program,
            created_at: Utc::now(),
        }
    }
}

impl Record for Contact {
    const COLLECTION: &'static str = "contacts";
    const ENTITY: &'static str = "Contact";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
