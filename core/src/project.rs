//! Project identity: created or joined through the backend, persisted in the
//! store under global keys, and used to scope a future remote sync. Tagging
//! itself works entirely on the local per-page store regardless of project.

use anyhow::{bail, Context, Result};

use crate::http::ApiClient;
use crate::store::{SyncStore, PROJECT_ID_KEY, PROJECT_KEY_KEY, PROJECT_NAME_KEY};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectIdentity {
    pub id: String,
    pub key: String,
    pub name: String,
}

impl ProjectIdentity {
    /// Reads the identity from the store; `None` until a project has been
    /// created or joined.
    pub fn load(store: &SyncStore) -> Option<Self> {
        Some(Self {
            id: store.get_string(PROJECT_ID_KEY)?,
            key: store.get_string(PROJECT_KEY_KEY)?,
            name: store.get_string(PROJECT_NAME_KEY)?,
        })
    }

    pub fn save(&self, store: &mut SyncStore) -> Result<()> {
        store.set_string(PROJECT_ID_KEY, &self.id)?;
        store.set_string(PROJECT_KEY_KEY, &self.key)?;
        store.set_string(PROJECT_NAME_KEY, &self.name)?;
        Ok(())
    }
}

/// Display form of a project key: everything but the last four characters
/// masked. The real key never leaves the store.
pub fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let visible_from = key.len().saturating_sub(4);
    let visible = &key[visible_from..];
    let masked = "•".repeat((key.len().saturating_sub(4)).max(4));
    format!("{}{}", masked, visible)
}

/// Creates a project and persists the returned identity. An empty name
/// blocks the action before any network call.
pub async fn create_project(
    api: &ApiClient,
    store: &mut SyncStore,
    name: &str,
    base_url: &str,
) -> Result<ProjectIdentity> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Please enter a project name.");
    }
    let response = api.create_project(name, base_url).await?;
    let identity = ProjectIdentity {
        id: response.project_id,
        key: response
            .project_key
            .context("create response carried no project key")?,
        name: response.project_name.unwrap_or_else(|| name.to_string()),
    };
    identity.save(store)?;
    Ok(identity)
}

/// Resolves an existing project by key and persists the identity. An empty
/// key blocks the action before any network call.
pub async fn join_project(
    api: &ApiClient,
    store: &mut SyncStore,
    key: &str,
) -> Result<ProjectIdentity> {
    let key = key.trim();
    if key.is_empty() {
        bail!("Please paste a project key.");
    }
    let response = api.resolve_project(key).await?;
    let identity = ProjectIdentity {
        name: response
            .project_name
            .unwrap_or_else(|| response.project_id.clone()),
        id: response.project_id,
        key: key.to_string(),
    };
    identity.save(store)?;
    Ok(identity)
}
