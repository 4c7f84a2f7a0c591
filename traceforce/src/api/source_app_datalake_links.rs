use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Client, Result};

const PATH: &str = "/source-app-datalake-links";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceAppDatalakeLink {
    pub id: String,
    pub source_app_id: String,
    pub datalake_id: String,
    #[serde(default)]
    pub hosting_environment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSourceAppDatalakeLinkRequest {
    pub source_app_id: String,
    pub datalake_id: String,
}

impl Client {
    pub async fn get_source_app_datalake_link(&self, id: &str) -> Result<SourceAppDatalakeLink> {
        self.get(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }

    pub async fn create_source_app_datalake_link(
        &self,
        request: &CreateSourceAppDatalakeLinkRequest,
    ) -> Result<SourceAppDatalakeLink> {
        self.post(PATH, request).await
    }

    pub async fn delete_source_app_datalake_link(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }
}
