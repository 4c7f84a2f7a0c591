use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Client, Result};

const PATH: &str = "/connections";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub environment_type: String,
    pub environment_native_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionRequest {
    pub name: String,
    pub environment_type: String,
    pub environment_native_id: String,
    pub status: String,
}

impl Client {
    pub async fn list_connections(&self) -> Result<Vec<Connection>> {
        self.get(PATH).await
    }

    pub async fn get_connection(&self, id: &str) -> Result<Connection> {
        self.get(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }

    pub async fn create_connection(&self, request: &ConnectionRequest) -> Result<Connection> {
        self.post(PATH, request).await
    }

    pub async fn update_connection(
        &self,
        id: &str,
        request: &ConnectionRequest,
    ) -> Result<Connection> {
        self.put(&format!("{}/{}", PATH, urlencoding::encode(id)), request)
            .await
    }

    pub async fn delete_connection(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }
}
