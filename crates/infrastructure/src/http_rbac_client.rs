//! REST adapter for the remote RBAC service.
//!
//! Implements every remote port over one authenticated `reqwest` client.
//! HTTP statuses and error bodies are translated into [`AppError`] kinds
//! here and nowhere else.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use rolebind_application::{IdentityResolver, ProjectDirectory, RoleBindingRepository};
use rolebind_core::{AppError, AppResult, UserIdentity};
use rolebind_domain::{EmailAddress, RoleBinding};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

mod status;
mod token;
mod wire;

use status::{classify_apply_failure, classify_status};
use token::TokenCache;
use wire::{ProjectManifest, RoleBindingManifest, TokenResponse, UsersResponse};

/// Connection settings for [`HttpRbacClient`].
#[derive(Debug, Clone)]
pub struct HttpRbacClientConfig {
    /// Base URL of the REST API, e.g. `https://app.nobl9.com/api`.
    pub api_url: Url,
    /// OAuth2 token endpoint for the client-credentials grant.
    pub auth_url: Url,
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Organization sent with every API call, when set.
    pub organization: Option<String>,
}

/// HTTP-based implementation of the identity, binding and project ports.
pub struct HttpRbacClient {
    http_client: reqwest::Client,
    config: HttpRbacClientConfig,
    tokens: TokenCache,
}

impl HttpRbacClient {
    /// Creates a client. No request is made until the first port call.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: HttpRbacClientConfig) -> Self {
        Self {
            http_client,
            config,
            tokens: TokenCache::default(),
        }
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        let base = self.config.api_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|error| {
            AppError::Configuration(format!("invalid API endpoint for '{path}': {error}"))
        })
    }

    async fn access_token(&self) -> AppResult<String> {
        if let Some(token) = self.tokens.valid_token().await {
            return Ok(token);
        }

        let operation = "request access token";
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("scope", "m2m")
            .finish();
        let response = self
            .http_client
            .post(self.config.auth_url.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(form)
            .send()
            .await
            .map_err(|error| transport_error(operation, &error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response_text(response).await;
            return Err(classify_status(status, operation, &body));
        }

        let token: TokenResponse = decode(response, operation).await?;
        debug!(expires_in = ?token.expires_in, "obtained access token");
        self.tokens
            .store(token.access_token.clone(), token.expires_in)
            .await;
        Ok(token.access_token)
    }

    async fn request(&self, method: Method, url: Url) -> AppResult<RequestBuilder> {
        let token = self.access_token().await?;
        let builder = self
            .http_client
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");

        Ok(match &self.config.organization {
            Some(organization) => builder.header("Organization", organization.as_str()),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> AppResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|error| transport_error(operation, &error))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        Ok(response)
    }

    async fn get_all<T: DeserializeOwned>(&self, url: Url, operation: &str) -> AppResult<T> {
        debug!(url = %url, "requesting {operation}");
        let builder = self.request(Method::GET, url).await?.header("Project", "*");
        let response = self.send(builder, operation).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response_text(response).await;
            return Err(classify_status(status, operation, &body));
        }

        decode(response, operation).await
    }
}

#[async_trait]
impl IdentityResolver for HttpRbacClient {
    async fn resolve_user(&self, email: &EmailAddress) -> AppResult<UserIdentity> {
        let mut url = self.endpoint("usrmgmt/v2/users")?;
        url.query_pairs_mut().append_pair("phrase", email.as_str());

        let response: UsersResponse = self.get_all(url, "list users").await?;
        response
            .users
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email.as_str()))
            .map(|user| UserIdentity::new(email.as_str(), user.user_id))
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }
}

#[async_trait]
impl RoleBindingRepository for HttpRbacClient {
    async fn list_role_bindings(&self) -> AppResult<Vec<RoleBinding>> {
        let url = self.endpoint("get/rolebinding")?;
        let manifests: Vec<RoleBindingManifest> =
            self.get_all(url, "list role bindings").await?;

        Ok(manifests
            .into_iter()
            .filter_map(RoleBindingManifest::into_binding)
            .collect())
    }

    async fn apply_binding(&self, binding: &RoleBinding) -> AppResult<()> {
        let operation = "apply role binding";
        let url = self.endpoint("apply")?;
        let manifests = [RoleBindingManifest::from_binding(binding)];

        let builder = self.request(Method::PUT, url).await?.json(&manifests);
        let response = self.send(builder, operation).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response_text(response).await;
        Err(classify_apply_failure(
            status,
            binding.name().as_str(),
            binding.project_ref(),
            &body,
        ))
    }
}

#[async_trait]
impl ProjectDirectory for HttpRbacClient {
    async fn list_project_names(&self) -> AppResult<Vec<String>> {
        let url = self.endpoint("get/project")?;
        let manifests: Vec<ProjectManifest> = self.get_all(url, "list projects").await?;

        Ok(manifests
            .into_iter()
            .map(|project| project.metadata.name)
            .collect())
    }
}

fn transport_error(operation: &str, error: &reqwest::Error) -> AppError {
    AppError::Transient(format!("{operation} transport error: {error}"))
}

async fn response_text(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned())
}

async fn decode<T: DeserializeOwned>(response: Response, operation: &str) -> AppResult<T> {
    response.json::<T>().await.map_err(|error| {
        AppError::Internal(format!("{operation} returned an unreadable body: {error}"))
    })
}
