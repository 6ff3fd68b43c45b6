use crate::domain::model::{Athlete, AthleteEvent, EntityId, Session, User};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn backend_url(&self) -> &str;
    fn anon_key(&self) -> &str;
    fn session_dir(&self) -> &str;
    fn feed_limit(&self) -> usize;
    fn request_timeout_seconds(&self) -> u64;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// `None` when the backend wants the address confirmed before issuing a session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>>;

    async fn sign_out(&self, session: &Session) -> Result<()>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session>;

    async fn current_user(&self, session: &Session) -> Result<User>;
}

#[async_trait]
pub trait AthleteStore: Send + Sync {
    /// Every athlete, ordered by name.
    async fn fetch_athletes(&self, session: &Session) -> Result<Vec<Athlete>>;

    async fn fetch_followed_athletes(&self, session: &Session, user_id: &str)
        -> Result<Vec<Athlete>>;

    async fn fetch_athlete(&self, session: &Session, id: &EntityId) -> Result<Athlete>;

    /// Newest first.
    async fn fetch_athlete_events(&self, session: &Session, id: &EntityId)
        -> Result<Vec<AthleteEvent>>;

    /// Recent events of every athlete `user_id` follows, newest first, with
    /// the athlete embedded in each row.
    async fn fetch_feed(
        &self,
        session: &Session,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<AthleteEvent>>;

    async fn follow(&self, session: &Session, user_id: &str, id: &EntityId) -> Result<()>;

    async fn unfollow(&self, session: &Session, user_id: &str, id: &EntityId) -> Result<()>;
}
