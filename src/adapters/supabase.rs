use crate::domain::model::{Athlete, AthleteEvent, EntityId, Session, User};
use crate::domain::ports::{AthleteStore, AuthProvider, ConfigProvider};
use crate::utils::error::{OrbitError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const EVENT_COLUMNS: &str = "id,title,start_time,result,category";
const FEED_COLUMNS: &str =
    "id,entity_id,title,start_time,result,category,entities(id,name,image_url)";

/// Client for the hosted backend: token auth under `/auth/v1`, table
/// queries under `/rest/v1`.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        // 舊版 auth 服務不回傳 expires_at，用 expires_in 推算
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|secs| chrono::Utc::now().timestamp() + secs)
        });

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_in: self.expires_in,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FollowedRow {
    #[serde(default)]
    entities: Option<Athlete>,
}

#[derive(Debug, Deserialize)]
struct FollowIdRow {
    entity_id: EntityId,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            client,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.backend_url(),
            config.anon_key(),
            Duration::from_secs(config.request_timeout_seconds()),
        )
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn anonymous(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        self.anonymous(request).bearer_auth(&session.access_token)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        check_status(request.send().await?).await?;
        Ok(())
    }

    async fn token_request(&self, grant_type: &str, body: serde_json::Value) -> Result<Session> {
        let request = self
            .anonymous(self.client.post(self.auth_url("token")))
            .query(&[("grant_type", grant_type)])
            .json(&body);

        let token: TokenResponse = self.send_json(request).await.map_err(into_auth_error)?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        tracing::debug!("🔐 Signing in {}", email);
        self.token_request(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        tracing::debug!("📝 Signing up {}", email);
        let request = self
            .anonymous(self.client.post(self.auth_url("signup")))
            .json(&serde_json::json!({ "email": email, "password": password }));

        let body: serde_json::Value = self.send_json(request).await.map_err(into_auth_error)?;

        // 需要信箱驗證時只會回傳 user 物件，沒有 token
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            Ok(Some(token.into_session()))
        } else {
            Ok(None)
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let request = self.authorized(self.client.post(self.auth_url("logout")), session);
        self.send_empty(request).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        tracing::debug!("🔄 Refreshing session");
        self.token_request(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn current_user(&self, session: &Session) -> Result<User> {
        let request = self.authorized(self.client.get(self.auth_url("user")), session);
        self.send_json(request).await.map_err(into_auth_error)
    }
}

#[async_trait]
impl AthleteStore for SupabaseClient {
    async fn fetch_athletes(&self, session: &Session) -> Result<Vec<Athlete>> {
        let request = self
            .authorized(self.client.get(self.rest_url("entities")), session)
            .query(&[("select", "*"), ("order", "name.asc")]);

        let athletes: Vec<Athlete> = self.send_json(request).await?;
        tracing::debug!("📡 Fetched {} athletes", athletes.len());
        Ok(athletes)
    }

    async fn fetch_followed_athletes(
        &self,
        session: &Session,
        user_id: &str,
    ) -> Result<Vec<Athlete>> {
        let user_filter = format!("eq.{}", user_id);
        let request = self
            .authorized(self.client.get(self.rest_url("follows")), session)
            .query(&[
                ("select", "entity_id,entities(*)"),
                ("user_id", user_filter.as_str()),
            ]);

        let rows: Vec<FollowedRow> = self.send_json(request).await?;
        // 被刪除的選手會以 null 嵌入，直接略過
        Ok(rows.into_iter().filter_map(|row| row.entities).collect())
    }

    async fn fetch_athlete(&self, session: &Session, id: &EntityId) -> Result<Athlete> {
        let id_filter = format!("eq.{}", id);
        let request = self
            .authorized(self.client.get(self.rest_url("entities")), session)
            .header("Accept", SINGLE_OBJECT)
            .query(&[("select", "*"), ("id", id_filter.as_str())]);

        self.send_json(request).await.map_err(|e| match e {
            OrbitError::BackendError { status, .. }
                if status == StatusCode::NOT_ACCEPTABLE.as_u16() =>
            {
                OrbitError::NotFound {
                    resource: "athlete".to_string(),
                    id: id.to_string(),
                }
            }
            other => other,
        })
    }

    async fn fetch_athlete_events(
        &self,
        session: &Session,
        id: &EntityId,
    ) -> Result<Vec<AthleteEvent>> {
        let id_filter = format!("eq.{}", id);
        let request = self
            .authorized(self.client.get(self.rest_url("events")), session)
            .query(&[
                ("select", EVENT_COLUMNS),
                ("entity_id", id_filter.as_str()),
                ("order", "start_time.desc"),
            ]);

        self.send_json(request).await
    }

    async fn fetch_feed(
        &self,
        session: &Session,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<AthleteEvent>> {
        let user_filter = format!("eq.{}", user_id);
        let request = self
            .authorized(self.client.get(self.rest_url("follows")), session)
            .query(&[("select", "entity_id"), ("user_id", user_filter.as_str())]);

        let follows: Vec<FollowIdRow> = self.send_json(request).await?;
        if follows.is_empty() {
            tracing::debug!("User {} follows nobody, feed is empty", user_id);
            return Ok(Vec::new());
        }

        let ids: Vec<String> = follows.iter().map(|f| f.entity_id.to_string()).collect();
        let id_filter = format!("in.({})", ids.join(","));
        let limit = limit.to_string();
        let request = self
            .authorized(self.client.get(self.rest_url("events")), session)
            .query(&[
                ("select", FEED_COLUMNS),
                ("entity_id", id_filter.as_str()),
                ("order", "start_time.desc"),
                ("limit", limit.as_str()),
            ]);

        let events: Vec<AthleteEvent> = self.send_json(request).await?;
        tracing::debug!(
            "📡 Feed has {} events from {} followed athletes",
            events.len(),
            ids.len()
        );
        Ok(events)
    }

    async fn follow(&self, session: &Session, user_id: &str, id: &EntityId) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.rest_url("follows")), session)
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!([{ "user_id": user_id, "entity_id": id }]));

        self.send_empty(request).await
    }

    async fn unfollow(&self, session: &Session, user_id: &str, id: &EntityId) -> Result<()> {
        let user_filter = format!("eq.{}", user_id);
        let id_filter = format!("eq.{}", id);
        let request = self
            .authorized(self.client.delete(self.rest_url("follows")), session)
            .query(&[
                ("user_id", user_filter.as_str()),
                ("entity_id", id_filter.as_str()),
            ]);

        self.send_empty(request).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    tracing::debug!("📡 Backend returned {}: {}", status, message);
    Err(OrbitError::BackendError {
        status: status.as_u16(),
        message,
    })
}

/// Both services report errors as JSON, but under different field names.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn into_auth_error(err: OrbitError) -> OrbitError {
    match err {
        OrbitError::BackendError { status, message } if (400..500).contains(&status) => {
            OrbitError::AuthError { message }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_fields() {
        assert_eq!(
            error_message(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            error_message(r#"{"code":"42501","message":"permission denied for table follows"}"#),
            Some("permission denied for table follows".to_string())
        );
        assert_eq!(error_message("<html>oops</html>"), None);
    }

    #[test]
    fn test_into_auth_error_only_for_client_errors() {
        let denied = into_auth_error(OrbitError::BackendError {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert!(matches!(denied, OrbitError::AuthError { .. }));

        let outage = into_auth_error(OrbitError::BackendError {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert!(matches!(outage, OrbitError::BackendError { status: 502, .. }));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            SupabaseClient::new("https://demo.supabase.co/", "anon", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.rest_url("entities"), "https://demo.supabase.co/rest/v1/entities");
        assert_eq!(client.auth_url("token"), "https://demo.supabase.co/auth/v1/token");
    }
}
