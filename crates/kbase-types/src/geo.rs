use serde::{Deserialize, Serialize};

/// Placeholder used wherever a location component is not known.
pub const UNKNOWN_LOCATION: &str = "未知";

/// Visit count attributed to one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub name: String,
    pub count: u64,
}

/// Resolved location of a client address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    pub ip: String,
    pub country: String,
    pub province: String,
    pub city: String,
}

impl IpAddress {
    pub fn unknown(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            country: UNKNOWN_LOCATION.into(),
            province: UNKNOWN_LOCATION.into(),
            city: UNKNOWN_LOCATION.into(),
        }
    }

    /// Key used by the visit statistics: `country|province|city`.
    pub fn geo_key(&self) -> String {
        format!("{}|{}|{}", self.country, self.province, self.city)
    }
}
