//! Typed HTTP client for the `/api` routes

use super::cache::{Fetcher, QueryKey, Resource};
use super::error::{ClientError, ClientResult};
use crate::config::DETAIL_FETCH_TIMEOUT;
use crate::database::{
    AuthResponse, BatchDeleteResponse, Card, CardNode, CreateCardNodeRequest, CreateCardRequest,
    CreateProjectRequest, Edge, EdgeInput, Project, SignInRequest, SignUpRequest, Tag,
    UpdateCardNodeRequest, UpdateCardRequest, User,
};
use crate::ideamap::{IdeaMap, LayoutDirection};
use crate::services::settings::{Settings, SettingsUpdate};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;

const USER_AGENT: &str = concat!("backyard-client/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    detail_timeout: Duration,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3000`
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            detail_timeout: DETAIL_FETCH_TIMEOUT,
        })
    }

    /// Override how long single-record reads may take
    pub fn with_detail_timeout(mut self, timeout: Duration) -> Self {
        self.detail_timeout = timeout;
        self
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and turn non-success statuses into `ClientError::Http`
    async fn execute(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        tracing::debug!("Request failed with {}: {}", status, message);
        Err(ClientError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let builder = self.request(Method::GET, path).await;
        Ok(self.execute(builder).await?.json().await?)
    }

    async fn get_detail<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let builder = self
            .request(Method::GET, path)
            .await
            .timeout(self.detail_timeout);
        Ok(self.execute(builder).await?.json().await?)
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let builder = self.request(method, path).await.json(body);
        Ok(self.execute(builder).await?.json().await?)
    }

    async fn send_empty(&self, method: Method, path: &str) -> ClientResult<()> {
        let builder = self.request(method, path).await;
        self.execute(builder).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Register and keep the issued token for later calls
    pub async fn sign_up(&self, req: &SignUpRequest) -> ClientResult<User> {
        let auth: AuthResponse = self.send(Method::POST, "auth/signup", req).await?;
        self.set_token(Some(auth.token)).await;
        Ok(auth.user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<User> {
        let req = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.send(Method::POST, "auth/signin", &req).await?;
        self.set_token(Some(auth.token)).await;
        Ok(auth.user)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.send_empty(Method::POST, "auth/signout").await?;
        self.set_token(None).await;
        Ok(())
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get("auth/me").await
    }

    // ===== Projects =====

    pub async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.get("projects").await
    }

    pub async fn create_project(&self, req: &CreateProjectRequest) -> ClientResult<Project> {
        self.send(Method::POST, "projects", req).await
    }

    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        self.get_detail(&format!("projects/{}", id)).await
    }

    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        self.send_empty(Method::DELETE, &format!("projects/{}", id))
            .await
    }

    pub async fn add_member(&self, project_id: &str, email: &str) -> ClientResult<User> {
        self.send(
            Method::POST,
            &format!("projects/{}/members", project_id),
            &json!({ "email": email }),
        )
        .await
    }

    // ===== Cards =====

    pub async fn list_cards(&self, project_id: Option<&str>) -> ClientResult<Vec<Card>> {
        let builder = self.request(Method::GET, "cards").await;
        let builder = match project_id {
            Some(id) => builder.query(&[("projectId", id)]),
            None => builder,
        };
        Ok(self.execute(builder).await?.json().await?)
    }

    pub async fn create_card(&self, req: &CreateCardRequest) -> ClientResult<Card> {
        self.send(Method::POST, "cards", req).await
    }

    pub async fn get_card(&self, id: &str) -> ClientResult<Card> {
        self.get_detail(&format!("cards/{}", id)).await
    }

    pub async fn update_card(&self, id: &str, req: &UpdateCardRequest) -> ClientResult<Card> {
        self.send(Method::PATCH, &format!("cards/{}", id), req).await
    }

    pub async fn delete_card(&self, id: &str) -> ClientResult<()> {
        self.send_empty(Method::DELETE, &format!("cards/{}", id)).await
    }

    // ===== Card nodes =====

    pub async fn list_card_nodes(&self, project_id: &str) -> ClientResult<Vec<CardNode>> {
        let builder = self
            .request(Method::GET, "cardnodes")
            .await
            .query(&[("projectId", project_id)]);
        Ok(self.execute(builder).await?.json().await?)
    }

    pub async fn create_card_node(&self, req: &CreateCardNodeRequest) -> ClientResult<CardNode> {
        self.send(Method::POST, "cardnodes", req).await
    }

    pub async fn update_card_node(
        &self,
        id: &str,
        req: &UpdateCardNodeRequest,
    ) -> ClientResult<CardNode> {
        self.send(Method::PATCH, &format!("cardnodes/{}", id), req)
            .await
    }

    pub async fn delete_card_node(&self, id: &str) -> ClientResult<()> {
        self.send_empty(Method::DELETE, &format!("cardnodes/{}", id))
            .await
    }

    // ===== Edges =====

    pub async fn list_edges(&self, project_id: &str) -> ClientResult<Vec<Edge>> {
        let builder = self
            .request(Method::GET, "edges")
            .await
            .query(&[("projectId", project_id)]);
        Ok(self.execute(builder).await?.json().await?)
    }

    pub async fn create_edge(&self, input: &EdgeInput) -> ClientResult<Edge> {
        self.send(Method::POST, "edges", input).await
    }

    pub async fn delete_edge(&self, id: &str) -> ClientResult<()> {
        self.send_empty(Method::DELETE, &format!("edges/{}", id)).await
    }

    pub async fn delete_edges(&self, ids: &[String]) -> ClientResult<u64> {
        let resp: BatchDeleteResponse = self
            .send(Method::POST, "edges/batch-delete", &json!({ "ids": ids }))
            .await?;
        Ok(resp.deleted)
    }

    // ===== Tags =====

    pub async fn list_tags(&self) -> ClientResult<Vec<Tag>> {
        self.get("tags").await
    }

    pub async fn create_tag(&self, name: &str) -> ClientResult<Tag> {
        self.send(Method::POST, "tags", &json!({ "name": name }))
            .await
    }

    // ===== Settings =====

    pub async fn get_settings(&self) -> ClientResult<Settings> {
        self.get("settings").await
    }

    pub async fn update_settings(&self, update: &SettingsUpdate) -> ClientResult<Settings> {
        self.send(Method::PATCH, "settings", update).await
    }

    pub async fn reset_settings(&self) -> ClientResult<Settings> {
        self.send(Method::POST, "settings/reset", &json!({})).await
    }

    // ===== Idea map =====

    pub async fn load_ideamap(&self, project_id: &str) -> ClientResult<IdeaMap> {
        self.get(&format!("projects/{}/ideamap", project_id)).await
    }

    pub async fn auto_layout(
        &self,
        project_id: &str,
        direction: Option<LayoutDirection>,
    ) -> ClientResult<IdeaMap> {
        let body = match direction {
            Some(direction) => json!({ "direction": direction }),
            None => json!({}),
        };
        self.send(
            Method::POST,
            &format!("projects/{}/ideamap/layout", project_id),
            &body,
        )
        .await
    }
}

#[async_trait]
impl Fetcher for ApiClient {
    async fn fetch(&self, key: &QueryKey) -> ClientResult<Value> {
        let path = key.resource.path();

        if let Some(id) = key.param("id") {
            if key.resource == Resource::Settings {
                return Err(ClientError::Query("Settings have no detail route".to_string()));
            }
            return self.get_detail(&format!("{}/{}", path, id)).await;
        }

        let query: Vec<(&str, &str)> = key
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let builder = self.request(Method::GET, path).await.query(&query);
        Ok(self.execute(builder).await?.json().await?)
    }
}
