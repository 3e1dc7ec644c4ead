pub mod client;

pub use client::ApiClient;

use serde::{Deserialize, Serialize};

/// Default backend address; override per call site when hosting remotely.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCreateRequest {
    pub project_name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResolveRequest {
    pub project_key: String,
}

/// Project payload returned by both endpoints. `project_key` is only present
/// on creation; resolve callers already hold the key.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectResponse {
    pub project_id: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_fields() {
        let value = serde_json::to_value(ProjectCreateRequest {
            project_name: "acme-audit".to_string(),
            base_url: "https://example.com".to_string(),
        })
        .unwrap();
        assert_eq!(value["project_name"], "acme-audit");
        assert_eq!(value["base_url"], "https://example.com");
    }

    #[test]
    fn test_response_tolerates_missing_optionals() {
        let resolved: ProjectResponse = serde_json::from_str(
            r#"{"project_id":"prj_ab12cd34","project_name":"acme-audit"}"#,
        )
        .unwrap();
        assert_eq!(resolved.project_id, "prj_ab12cd34");
        assert!(resolved.project_key.is_none());
    }
}
