use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Client, Result};

const PATH: &str = "/source-apps";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceApp {
    pub id: String,
    #[serde(default)]
    pub datalake_id: String,
    #[serde(default)]
    pub hosting_environment_id: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSourceAppRequest {
    pub datalake_id: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub name: String,
}

/// Partial update; only set fields are changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSourceAppRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Client {
    pub async fn list_source_apps(&self) -> Result<Vec<SourceApp>> {
        self.get(PATH).await
    }

    pub async fn list_source_apps_by_hosting_environment(
        &self,
        hosting_environment_id: &str,
    ) -> Result<Vec<SourceApp>> {
        self.get(&format!(
            "{}?hosting_environment_id={}",
            PATH,
            urlencoding::encode(hosting_environment_id)
        ))
        .await
    }

    pub async fn get_source_app(&self, id: &str) -> Result<SourceApp> {
        self.get(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }

    pub async fn create_source_app(&self, request: &CreateSourceAppRequest) -> Result<SourceApp> {
        self.post(PATH, request).await
    }

    pub async fn update_source_app(
        &self,
        id: &str,
        request: &UpdateSourceAppRequest,
    ) -> Result<SourceApp> {
        self.patch(&format!("{}/{}", PATH, urlencoding::encode(id)), request)
            .await
    }

    pub async fn delete_source_app(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }
}
