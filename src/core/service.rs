use crate::adapters::session::SessionStore;
use crate::core::catalog::{CatalogView, FollowSet};
use crate::domain::model::{AthleteEvent, AthleteProfile, EntityId, Session, User};
use crate::domain::ports::{AthleteStore, AuthProvider, Storage};
use crate::utils::error::{OrbitError, Result};
use crate::utils::validation::{validate_email, validate_non_empty_string};

pub const DEFAULT_FEED_LIMIT: usize = 50;

/// Drives the backend on behalf of one signed-in user.
pub struct OrbitService<A: AuthProvider, S: AthleteStore, T: Storage> {
    auth: A,
    store: S,
    sessions: SessionStore<T>,
    feed_limit: usize,
}

impl<A: AuthProvider, S: AthleteStore, T: Storage> OrbitService<A, S, T> {
    pub fn new(auth: A, store: S, storage: T) -> Self {
        Self {
            auth,
            store,
            sessions: SessionStore::new(storage),
            feed_limit: DEFAULT_FEED_LIMIT,
        }
    }

    pub fn with_feed_limit(mut self, feed_limit: usize) -> Self {
        self.feed_limit = feed_limit;
        self
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_email("email", email)?;
        validate_non_empty_string("password", password)?;

        let session = self.auth.sign_in(email.trim(), password).await?;
        self.sessions.save(&session).await?;
        tracing::info!("✅ Signed in as {}", email.trim());
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        validate_email("email", email)?;
        validate_non_empty_string("password", password)?;

        let session = self.auth.sign_up(email.trim(), password).await?;
        match &session {
            Some(session) => {
                self.sessions.save(session).await?;
                tracing::info!("✅ Account created and signed in");
            }
            None => tracing::info!("📧 Account created, confirm your email before signing in"),
        }
        Ok(session)
    }

    /// Local session is cleared even when the remote revoke fails.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.sessions.load().await? {
            if let Err(e) = self.auth.sign_out(&session).await {
                tracing::warn!("⚠️ Remote sign out failed: {}", e);
            }
        }
        self.sessions.clear().await?;
        tracing::info!("👋 Signed out");
        Ok(())
    }

    /// The stored session, refreshed first if it has expired.
    pub async fn current_session(&self) -> Result<Session> {
        let session = self
            .sessions
            .load()
            .await?
            .ok_or(OrbitError::NotAuthenticated)?;

        if !session.is_expired(chrono::Utc::now()) {
            return Ok(session);
        }

        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or(OrbitError::NotAuthenticated)?;

        tracing::debug!("🔄 Session expired, refreshing");
        let refreshed = match self.auth.refresh(refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(OrbitError::AuthError { message }) => {
                tracing::warn!("⚠️ Refresh rejected: {}", message);
                self.sessions.clear().await?;
                return Err(OrbitError::NotAuthenticated);
            }
            Err(e) => return Err(e),
        };
        self.sessions.save(&refreshed).await?;
        Ok(refreshed)
    }

    pub async fn current_user(&self, session: &Session) -> Result<User> {
        self.auth.current_user(session).await
    }

    /// All athletes and the followed subset, fetched together. A failed fetch
    /// leaves its half empty rather than failing the whole screen.
    pub async fn load_catalog(&self, session: &Session) -> CatalogView {
        let (athletes, followed) = tokio::join!(
            self.store.fetch_athletes(session),
            self.store.fetch_followed_athletes(session, session.user_id())
        );

        let athletes = athletes.unwrap_or_else(|e| {
            tracing::error!("❌ Error fetching athletes: {}", e);
            Vec::new()
        });
        let followed = followed.unwrap_or_else(|e| {
            tracing::error!("❌ Error fetching followed athletes: {}", e);
            Vec::new()
        });

        tracing::debug!(
            "📂 Catalog loaded: {} athletes, {} followed",
            athletes.len(),
            followed.len()
        );

        CatalogView {
            athletes,
            followed: FollowSet::from_athletes(&followed),
        }
    }

    pub async fn athlete_profile(
        &self,
        session: &Session,
        id: &EntityId,
    ) -> Result<AthleteProfile> {
        let athlete = self.store.fetch_athlete(session, id).await?;
        let events = self.store.fetch_athlete_events(session, id).await?;
        Ok(AthleteProfile { athlete, events })
    }

    pub async fn feed(&self, session: &Session) -> Vec<AthleteEvent> {
        match self
            .store
            .fetch_feed(session, session.user_id(), self.feed_limit)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("❌ Error loading feed: {}", e);
                Vec::new()
            }
        }
    }

    /// Optimistic toggle: `follows` changes immediately and is put back if
    /// the backend refuses. Returns whether the change stuck.
    pub async fn toggle_follow(
        &self,
        session: &Session,
        follows: &mut FollowSet,
        id: &EntityId,
    ) -> bool {
        let before = follows.snapshot();
        let was_following = follows.toggle(id);

        let outcome = if was_following {
            self.store.unfollow(session, session.user_id(), id).await
        } else {
            self.store.follow(session, session.user_id(), id).await
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    "{} athlete {}",
                    if was_following { "💔 Unfollowed" } else { "⭐ Followed" },
                    id
                );
                true
            }
            Err(e) => {
                tracing::error!("❌ Could not update follow status for {}: {}", id, e);
                follows.restore(before);
                false
            }
        }
    }

    pub async fn follow(&self, session: &Session, id: &EntityId) -> Result<()> {
        self.store.follow(session, session.user_id(), id).await
    }

    pub async fn unfollow(&self, session: &Session, id: &EntityId) -> Result<()> {
        self.store.unfollow(session, session.user_id(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::session::SESSION_FILE;
    use crate::domain::model::Athlete;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                OrbitError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn remove_file(&self, path: &str) -> Result<()> {
            self.files.lock().await.remove(path);
            Ok(())
        }
    }

    fn session(expires_at: i64) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
            expires_at: Some(expires_at),
            user: User {
                id: "user-1".to_string(),
                email: Some("fan@example.com".to_string()),
            },
        }
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        fail_writes: bool,
        fail_reads: bool,
        reject_refresh: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockBackend {
        async fn record(&self, call: String) {
            self.calls.lock().await.push(call);
        }

        async fn calls(&self) -> Vec<String> {
            self.calls.lock().await.clone()
        }

        fn athlete(id: &str, name: &str) -> Athlete {
            Athlete {
                id: EntityId::from(id),
                name: name.to_string(),
                category: Some("tennis".to_string()),
                subcategory: None,
                image_url: None,
            }
        }

        fn read_result<T>(&self, value: T) -> Result<T> {
            if self.fail_reads {
                Err(OrbitError::BackendError {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(value)
            }
        }
    }

    #[async_trait]
    impl AuthProvider for MockBackend {
        async fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
            self.record(format!("sign_in:{}", email)).await;
            Ok(session(i64::MAX))
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<Option<Session>> {
            Ok(None)
        }

        async fn sign_out(&self, _session: &Session) -> Result<()> {
            self.record("sign_out".to_string()).await;
            Err(OrbitError::BackendError {
                status: 500,
                message: "logout failed".to_string(),
            })
        }

        async fn refresh(&self, refresh_token: &str) -> Result<Session> {
            self.record(format!("refresh:{}", refresh_token)).await;
            if self.reject_refresh {
                return Err(OrbitError::AuthError {
                    message: "Invalid Refresh Token".to_string(),
                });
            }
            let mut renewed = session(i64::MAX);
            renewed.access_token = "renewed".to_string();
            Ok(renewed)
        }

        async fn current_user(&self, session: &Session) -> Result<User> {
            Ok(session.user.clone())
        }
    }

    #[async_trait]
    impl AthleteStore for MockBackend {
        async fn fetch_athletes(&self, _session: &Session) -> Result<Vec<Athlete>> {
            self.read_result(vec![
                Self::athlete("1", "Carlos Alcaraz"),
                Self::athlete("2", "Coco Gauff"),
            ])
        }

        async fn fetch_followed_athletes(
            &self,
            _session: &Session,
            _user_id: &str,
        ) -> Result<Vec<Athlete>> {
            Ok(vec![Self::athlete("2", "Coco Gauff")])
        }

        async fn fetch_athlete(&self, _session: &Session, id: &EntityId) -> Result<Athlete> {
            Err(OrbitError::NotFound {
                resource: "athlete".to_string(),
                id: id.to_string(),
            })
        }

        async fn fetch_athlete_events(
            &self,
            _session: &Session,
            _id: &EntityId,
        ) -> Result<Vec<AthleteEvent>> {
            Ok(Vec::new())
        }

        async fn fetch_feed(
            &self,
            _session: &Session,
            user_id: &str,
            limit: usize,
        ) -> Result<Vec<AthleteEvent>> {
            self.record(format!("feed:{}:{}", user_id, limit)).await;
            self.read_result(Vec::new())
        }

        async fn follow(&self, _session: &Session, user_id: &str, id: &EntityId) -> Result<()> {
            self.record(format!("follow:{}:{}", user_id, id)).await;
            if self.fail_writes {
                return Err(OrbitError::BackendError {
                    status: 403,
                    message: "denied".to_string(),
                });
            }
            Ok(())
        }

        async fn unfollow(&self, _session: &Session, user_id: &str, id: &EntityId) -> Result<()> {
            self.record(format!("unfollow:{}:{}", user_id, id)).await;
            if self.fail_writes {
                return Err(OrbitError::BackendError {
                    status: 403,
                    message: "denied".to_string(),
                });
            }
            Ok(())
        }
    }

    fn service(
        backend: &MockBackend,
        storage: &MockStorage,
    ) -> OrbitService<MockBackend, MockBackend, MockStorage> {
        OrbitService::new(backend.clone(), backend.clone(), storage.clone())
    }

    #[tokio::test]
    async fn test_sign_in_persists_session() {
        let backend = MockBackend::default();
        let storage = MockStorage::default();
        let service = service(&backend, &storage);

        service.sign_in(" fan@example.com ", "secret").await.unwrap();

        assert!(storage.files.lock().await.contains_key(SESSION_FILE));
        assert_eq!(backend.calls().await, vec!["sign_in:fan@example.com"]);
        assert_eq!(service.current_session().await.unwrap().access_token, "access");
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_email_before_calling_backend() {
        let backend = MockBackend::default();
        let service = service(&backend, &MockStorage::default());

        let err = service.sign_in("not-an-email", "secret").await.unwrap_err();
        assert!(matches!(err, OrbitError::ValidationError { .. }));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_current_session_without_login() {
        let service = service(&MockBackend::default(), &MockStorage::default());
        let err = service.current_session().await.unwrap_err();
        assert!(matches!(err, OrbitError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed() {
        let backend = MockBackend::default();
        let storage = MockStorage::default();
        let service = service(&backend, &storage);
        SessionStore::new(storage.clone()).save(&session(0)).await.unwrap();

        let current = service.current_session().await.unwrap();

        assert_eq!(current.access_token, "renewed");
        assert_eq!(backend.calls().await, vec!["refresh:refresh"]);
        let stored = SessionStore::new(storage.clone()).load().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "renewed");
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out_locally() {
        let backend = MockBackend {
            reject_refresh: true,
            ..Default::default()
        };
        let storage = MockStorage::default();
        let service = service(&backend, &storage);
        SessionStore::new(storage.clone()).save(&session(0)).await.unwrap();

        let err = service.current_session().await.unwrap_err();
        assert!(matches!(err, OrbitError::NotAuthenticated));
        assert!(!storage.files.lock().await.contains_key(SESSION_FILE));
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_if_remote_fails() {
        let backend = MockBackend::default();
        let storage = MockStorage::default();
        let service = service(&backend, &storage);
        SessionStore::new(storage.clone()).save(&session(i64::MAX)).await.unwrap();

        service.sign_out().await.unwrap();

        assert_eq!(backend.calls().await, vec!["sign_out"]);
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_catalog_marks_followed() {
        let service = service(&MockBackend::default(), &MockStorage::default());
        let view = service.load_catalog(&session(i64::MAX)).await;

        assert_eq!(view.athletes.len(), 2);
        assert!(view.followed.contains(&EntityId::from("2")));
        assert!(!view.followed.contains(&EntityId::from("1")));
    }

    #[tokio::test]
    async fn test_load_catalog_degrades_on_error() {
        let backend = MockBackend {
            fail_reads: true,
            ..Default::default()
        };
        let service = service(&backend, &MockStorage::default());
        let view = service.load_catalog(&session(i64::MAX)).await;

        assert!(view.athletes.is_empty());
        assert_eq!(view.followed.len(), 1);
    }

    #[tokio::test]
    async fn test_feed_uses_limit_and_degrades() {
        let backend = MockBackend {
            fail_reads: true,
            ..Default::default()
        };
        let service = service(&backend, &MockStorage::default()).with_feed_limit(10);

        assert!(service.feed(&session(i64::MAX)).await.is_empty());
        assert_eq!(backend.calls().await, vec!["feed:user-1:10"]);
    }

    #[tokio::test]
    async fn test_toggle_follow_success() {
        let backend = MockBackend::default();
        let service = service(&backend, &MockStorage::default());
        let mut follows = FollowSet::new();
        let id = EntityId::from("7");

        assert!(service.toggle_follow(&session(i64::MAX), &mut follows, &id).await);
        assert!(follows.contains(&id));

        assert!(service.toggle_follow(&session(i64::MAX), &mut follows, &id).await);
        assert!(!follows.contains(&id));

        assert_eq!(
            backend.calls().await,
            vec!["follow:user-1:7", "unfollow:user-1:7"]
        );
    }

    #[tokio::test]
    async fn test_toggle_follow_reverts_on_failure() {
        let backend = MockBackend {
            fail_writes: true,
            ..Default::default()
        };
        let service = service(&backend, &MockStorage::default());
        let mut follows = FollowSet::new();
        let id = EntityId::from("7");

        assert!(!service.toggle_follow(&session(i64::MAX), &mut follows, &id).await);
        assert!(!follows.contains(&id));
    }

    #[tokio::test]
    async fn test_profile_error_propagates() {
        let service = service(&MockBackend::default(), &MockStorage::default());
        let err = service
            .athlete_profile(&session(i64::MAX), &EntityId::from("404"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrbitError::NotFound { .. }));
    }
}
