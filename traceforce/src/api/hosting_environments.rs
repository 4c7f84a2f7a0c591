//! Hosting environments, exposed to Terraform users as projects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Client, Result};

pub const STATUS_PENDING: &str = "Pending";

const PATH: &str = "/hosting-environments";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostingEnvironment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: String,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub native_id: String,
    pub status: String,
    #[serde(default)]
    pub control_plane_aws_account_id: Option<String>,
    #[serde(default)]
    pub control_plane_role_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for both create and full update
#[derive(Debug, Clone, Serialize)]
pub struct HostingEnvironmentRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: String,
    pub cloud_provider: String,
    pub native_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PostConnectionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<Infrastructure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_module_versions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_module_versions_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_datalake_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_source_app_ids: Option<Vec<String>>,
}

/// Infrastructure deployed on the customer side, reported after connecting
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Infrastructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseInfrastructure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bigquery: Option<BigQueryInfrastructure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salesforce: Option<SalesforceInfrastructure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BaseInfrastructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataplane_identity_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_identity_provider_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_view_generator_function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_view_generator_function_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceforce_bucket_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BigQueryInfrastructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceforce_schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_subscription_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesforceInfrastructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salesforce_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salesforce_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salesforce_client_secret: Option<String>,
}

impl Client {
    pub async fn list_hosting_environments(&self) -> Result<Vec<HostingEnvironment>> {
        self.get(PATH).await
    }

    pub async fn get_hosting_environment(&self, id: &str) -> Result<HostingEnvironment> {
        self.get(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }

    pub async fn get_hosting_environment_by_name(&self, name: &str) -> Result<HostingEnvironment> {
        self.get(&format!("{}/by-name/{}", PATH, urlencoding::encode(name)))
            .await
    }

    pub async fn create_hosting_environment(
        &self,
        request: &HostingEnvironmentRequest,
    ) -> Result<HostingEnvironment> {
        self.post(PATH, request).await
    }

    pub async fn update_hosting_environment(
        &self,
        id: &str,
        request: &HostingEnvironmentRequest,
    ) -> Result<HostingEnvironment> {
        self.put(&format!("{}/{}", PATH, urlencoding::encode(id)), request)
            .await
    }

    pub async fn delete_hosting_environment(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/{}", PATH, urlencoding::encode(id)))
            .await
    }

    /// Reports post-connection infrastructure for a project
    pub async fn post_connection(
        &self,
        id: &str,
        request: &PostConnectionRequest,
    ) -> Result<HostingEnvironment> {
        self.post(
            &format!("{}/{}/post-connection", PATH, urlencoding::encode(id)),
            request,
        )
        .await
    }
}
