use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Edition reported for every installation.
pub const LICENSE_EDITION: u8 = 3;
/// License state reported for every installation.
pub const LICENSE_STATE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseKind {
    Code,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub kind: LicenseKind,
    pub code: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseResp {
    pub edition: u8,
    pub state: u8,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<LicenseKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
