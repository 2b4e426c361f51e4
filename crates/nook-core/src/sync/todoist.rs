//! Todoist REST client.
//!
//! Read-only: sections and active tasks, bearer-token authenticated.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSection {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteDue {
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTask {
    pub id: String,
    pub content: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub due: Option<RemoteDue>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
}

fn default_priority() -> u8 {
    1
}

/// Sections and tasks fetched in one poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    /// `None` when the sections request failed.
    pub sections: Option<Vec<RemoteSection>>,
    pub tasks: Vec<RemoteTask>,
}

#[derive(Debug, Clone)]
pub struct TodoistClient {
    client: Client,
    base: Url,
    token: String,
}

impl TodoistClient {
    /// `base_url` is the REST root, e.g. `https://api.todoist.com/rest/v2`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, SyncError> {
        if token.trim().is_empty() {
            return Err(SyncError::MissingToken);
        }
        // Url::join replaces the last segment unless the base ends in '/'.
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        Ok(Self {
            client: Client::new(),
            base: Url::parse(&base)?,
            token: token.trim().to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, SyncError> {
        let url = self.base.join(endpoint)?;
        tracing::debug!(%url, "task API request");
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn fetch_sections(&self) -> Result<Vec<RemoteSection>, SyncError> {
        self.get("sections").await
    }

    pub async fn fetch_tasks(&self) -> Result<Vec<RemoteTask>, SyncError> {
        self.get("tasks").await
    }

    /// Sections then tasks. A failed sections request yields
    /// `sections: None`; a failed tasks request fails the poll.
    pub async fn fetch_snapshot(&self) -> Result<RemoteSnapshot, SyncError> {
        let sections = match self.fetch_sections().await {
            Ok(sections) => Some(sections),
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch sections");
                None
            }
        };
        let tasks = self.fetch_tasks().await?;
        Ok(RemoteSnapshot { sections, tasks })
    }
}
