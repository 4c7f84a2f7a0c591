use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Client, Result};

pub const STATUS_PENDING: &str = "Pending";

const PATH: &str = "/datalakes";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Datalake {
    pub id: String,
    pub hosting_environment_id: String,
    #[serde(rename = "type")]
    pub datalake_type: String,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatalakeRequest {
    pub hosting_environment_id: String,
    #[serde(rename = "type")]
    pub datalake_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Client {
    pub async fn list_datalakes(&self) -> Result<Vec<Datalake>> {
        self.get(PATH).await
    }

    pub async fn list_datalakes_by_hosting_environment(
        &self,
        hosting_environment_id: &str,
    ) -> Result<Vec<Datalake>> {
        self.get(&format!(
            "{}?hosting_environment_id={}",
            PATH,
            urlencoding::encode(hosting_environment_id)
        ))
        .await
    }

    pub async fn get_datalake(&self, id: &str) -> Result<Datalake> {
        self.get(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }

    pub async fn create_datalake(&self, request: &DatalakeRequest) -> Result<Datalake> {
        self.post(PATH, request).await
    }

    pub async fn update_datalake(&self, id: &str, request: &DatalakeRequest) -> Result<Datalake> {
        self.put(&format!("{}/{}", PATH, urlencoding::encode(id)), request)
            .await
    }

    pub async fn delete_datalake(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }
}
