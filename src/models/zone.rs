use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{generate_id, BlobRef, Record};

/// A service zone garages are grouped under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub zone_name: String,
    pub zone_image: BlobRef,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new zone; the image is uploaded separately
#[derive(Debug, Clone, Default)]
pub struct NewZone {
    pub zone_name: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct ZonePatch {
    pub zone_name: Option<String>,
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneResponse {
    #[serde(flatten)]
    pub zone: Zone,
    pub zone_image_url: String,
}

impl Zone {
    pub fn new(zone_name: String, zone_image: BlobRef, uploaded_by: String) -> Self {
        Self {
            id: generate_id('Z'),
            zone_name,
            zone_image,
            uploaded_by,
            created_at: Utc::now(),
        }
    }

    pub fn to_response<F>(&self, url_for: F) -> ZoneResponse
    where
        F: Fn(&BlobRef) -> String,
    {
        ZoneResponse {
            zone_image_url: url_for(&self.zone_image),
            zone: self.clone(),
        }
    }
}

impl Record for Zone {
    const COLLECTION: &'static str = "zones";
    const ENTITY: &'static str = "Zone";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("zoneName", self.zone_name.clone())]
    }
}
