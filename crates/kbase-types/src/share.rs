use serde::{Deserialize, Serialize};

use crate::KbaseError;

/// Document node type carrying rich text content.
pub const NODE_TYPE_DOCUMENT: u8 = 2;

/// Response envelope returned by every share API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeMeta {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetail {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta: NodeMeta,
}

impl NodeDetail {
    /// Rich text body, only present on non-empty document nodes.
    pub fn document_content(&self) -> Option<&str> {
        (self.kind == NODE_TYPE_DOCUMENT && !self.content.is_empty())
            .then_some(self.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WebInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthInfo {
    #[serde(default)]
    pub auth_type: i64,
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Failure captured while loading page data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub status: Option<u16>,
    pub message: String,
}

impl From<&KbaseError> for PageError {
    fn from(err: &KbaseError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// Data backing a document page; a failed fetch leaves `node` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub node: Option<NodeDetail>,
    pub error: Option<PageError>,
}

/// Data backing the site chrome shared by every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    pub web_info: Option<WebInfo>,
    pub auth_info: Option<AuthInfo>,
    /// Set only when the auth endpoint refused access.
    pub error: Option<PageError>,
}
