//! IBM Quantum REST API client.
//!
//! This module implements the parts of the IBM Quantum REST API the provider
//! needs:
//! - Token login (`/users/loginWithToken`) and service URL discovery
//! - Listing the hub/group/project instances of the account
//! - Backend configurations and live queue status
//! - Job listing with a `where` filter, and single-job fetch
//!
//! The [`JobApi`] trait is the seam the pagination driver and the typed jobs
//! talk to; [`IbmClient`] is its HTTP implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use qbridge_hal::{ConnectionConfig, Instance};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{IbmError, IbmResult};
use crate::filter::LogicalFilter;
use crate::record::RawJobRecord;

/// Default IBM Quantum authentication URL.
pub const DEFAULT_AUTH_URL: &str = "https://auth.quantum-computing.ibm.com/api";

/// User-Agent sent with requests.
const USER_AGENT: &str = concat!("qbridge/", env!("CARGO_PKG_VERSION"));

/// Header carrying the access token.
const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Remote job listing and fetch operations.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// One page of job records matching `filter`, ordered by creation date.
    ///
    /// The server may return fewer than `page_size` records even when more
    /// match.
    async fn list_jobs(
        &self,
        filter: &LogicalFilter,
        page_size: usize,
        skip: usize,
        descending: bool,
    ) -> IbmResult<Vec<RawJobRecord>>;

    /// A single job record. Fails with [`IbmError::JobNotFound`] if the id is
    /// unknown.
    async fn get_job(&self, job_id: &str) -> IbmResult<RawJobRecord>;
}

/// Query string payload of a job listing request.
pub fn jobs_status_query(
    filter: &LogicalFilter,
    limit: usize,
    skip: usize,
    descending: bool,
) -> Value {
    let order = if descending { "DESC" } else { "ASC" };
    let mut query = json!({
        "order": format!("creationDate {order}"),
        "limit": limit,
        "skip": skip,
    });
    if !filter.is_empty() {
        query["where"] = filter.to_json();
    }
    query
}

/// IBM Quantum API client.
pub struct IbmClient {
    /// HTTP client with the access token installed.
    client: Client,
    /// Service URL returned at login.
    api_url: String,
    /// Selected hub/group/project.
    instance: Option<Instance>,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("api_url", &self.api_url)
            .field("instance", &self.instance)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    /// Access token.
    id: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    urls: ServiceUrls,
}

#[derive(Debug, Deserialize)]
struct ServiceUrls {
    http: String,
}

impl IbmClient {
    /// Exchange the API token of `config` for an access token and discover
    /// the service URL.
    pub async fn login(config: &ConnectionConfig) -> IbmResult<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(IbmError::MissingToken)?;

        let auth_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let login_url = format!("{}/users/loginWithToken", config.auth_url);
        let response = auth_client
            .post(&login_url)
            .json(&json!({ "apiToken": token }))
            .send()
            .await
            .map_err(|e| IbmError::LoginFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(if status == StatusCode::UNAUTHORIZED {
                IbmError::InvalidToken(body)
            } else {
                IbmError::LoginFailed(format!("{status}: {body}"))
            });
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            IbmError::LoginFailed(format!("failed to parse login response: {e}"))
        })?;

        let user_info: UserInfoResponse = auth_client
            .get(format!("{}/users/me", config.auth_url))
            .header(ACCESS_TOKEN_HEADER, &login.id)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!("logged in to {}", config.auth_url);
        Self::with_access_token(user_info.urls.http, login.id, config.timeout())
    }

    /// Client for a service URL and an access token obtained elsewhere.
    pub fn with_access_token(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> IbmResult<Self> {
        let access_token: String = access_token.into();
        let token_value = header::HeaderValue::from_str(&access_token)
            .map_err(|_| IbmError::InvalidToken("token is not a valid header value".into()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::HeaderName::from_static(ACCESS_TOKEN_HEADER),
            token_value,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            instance: None,
        })
    }

    /// Select the hub/group/project used for backend and job requests.
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// The selected instance.
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// The service URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn instance_url(&self) -> IbmResult<String> {
        let instance = self.instance.as_ref().ok_or_else(|| {
            IbmError::NoInstance("no hub/group/project selected for this client".into())
        })?;
        Ok(format!(
            "{}/Network/{}/Groups/{}/Projects/{}",
            self.api_url, instance.hub, instance.group, instance.project
        ))
    }

    /// Instances the account can access, in the order the server lists them.
    pub async fn user_hubs(&self) -> IbmResult<Vec<Instance>> {
        let url = format!("{}/Network", self.api_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let hubs: Vec<HubInfo> = response.json().await?;
        let mut instances = Vec::new();
        for hub in hubs {
            for (group_name, group) in hub.groups {
                for project in group.projects.into_keys() {
                    instances.push(Instance::new(&hub.name, &group_name, project));
                }
            }
        }
        Ok(instances)
    }

    /// Configurations of the backends the instance can use.
    pub async fn list_backends(&self) -> IbmResult<Vec<BackendInfo>> {
        let url = format!("{}/devices/v/1", self.instance_url()?);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// Live status of a backend.
    pub async fn backend_status(&self, name: &str) -> IbmResult<BackendStatus> {
        let url = format!("{}/devices/{}/queue/status", self.instance_url()?, name);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            if response.status() == StatusCode::NOT_FOUND {
                return Err(IbmError::BackendNotFound(name.to_string()));
            }
            return Err(api_error(response).await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// One page of job records.
    pub async fn list_jobs_statuses(
        &self,
        filter: &LogicalFilter,
        limit: usize,
        skip: usize,
        descending: bool,
    ) -> IbmResult<Vec<RawJobRecord>> {
        let url = format!("{}/Jobs/status/v/1", self.instance_url()?);
        let query = jobs_status_query(filter, limit, skip, descending);
        debug!("Endpoint: {url}. Method: GET. Filter: {query}");

        let response = self
            .client
            .get(&url)
            .query(&[("filter", query.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// A single job record.
    pub async fn job_get(&self, job_id: &str) -> IbmResult<RawJobRecord> {
        let url = format!("{}/Jobs/{}/v/1", self.instance_url()?, job_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(match api_error(response).await {
                IbmError::ApiError { code, message }
                    if IbmError::is_job_not_found_code(code.as_deref(), &message) =>
                {
                    IbmError::JobNotFound(job_id.to_string())
                }
                other => other,
            });
        }
        response.json().await.map_err(IbmError::from)
    }
}

#[async_trait]
impl JobApi for IbmClient {
    async fn list_jobs(
        &self,
        filter: &LogicalFilter,
        page_size: usize,
        skip: usize,
        descending: bool,
    ) -> IbmResult<Vec<RawJobRecord>> {
        self.list_jobs_statuses(filter, page_size, skip, descending)
            .await
    }

    async fn get_job(&self, job_id: &str) -> IbmResult<RawJobRecord> {
        self.job_get(job_id).await
    }
}

/// Turn an unsuccessful response into an API error.
async fn api_error(response: reqwest::Response) -> IbmError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "no body".to_string());
    parse_api_error(status, &body)
}

fn parse_api_error(status: StatusCode, body: &str) -> IbmError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => IbmError::ApiError {
            code: parsed.error.code.as_ref().and_then(code_string),
            message: parsed.error.message,
        },
        Err(_) => IbmError::ApiError {
            code: None,
            message: format!("{status}: {body}"),
        },
    }
}

fn code_string(code: &Value) -> Option<String> {
    match code {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Response types
// ============================================================================

/// API error response (`{"error": {...}}`).
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    /// Error code, a string or a number depending on the endpoint.
    #[serde(default)]
    code: Option<Value>,
    /// Error message.
    #[serde(default)]
    message: String,
}

/// A hub with its groups.
#[derive(Debug, Deserialize)]
struct HubInfo {
    name: String,
    #[serde(default)]
    groups: BTreeMap<String, GroupInfo>,
}

#[derive(Debug, Deserialize)]
struct GroupInfo {
    #[serde(default)]
    projects: BTreeMap<String, Value>,
}

/// Backend configuration from `/devices/v/1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Backend name.
    pub backend_name: String,
    /// Number of qubits.
    #[serde(default)]
    pub n_qubits: u32,
    /// Whether this is a simulator.
    #[serde(default)]
    pub simulator: bool,
    /// Backend version.
    #[serde(default)]
    pub backend_version: Option<String>,
    /// Basis gates.
    #[serde(default)]
    pub basis_gates: Vec<String>,
    /// Maximum number of shots.
    #[serde(default)]
    pub max_shots: Option<u32>,
}

/// Backend status from `/devices/{name}/queue/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendStatus {
    /// Whether the backend is operational.
    pub state: bool,
    /// Status string (e.g., "active").
    #[serde(default)]
    pub status: String,
    /// Queue length.
    #[serde(default)]
    pub length_queue: u64,
}
