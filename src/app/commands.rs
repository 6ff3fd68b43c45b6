use crate::adapters::{LocalStorage, SupabaseClient};
use crate::app::render::Renderer;
use crate::config::toml_config::TomlConfig;
use crate::config::{CliConfig, Command};
use crate::core::cards::CardBuilder;
use crate::core::catalog::AthleteFilter;
use crate::core::formatter::ResultFormatter;
use crate::core::service::OrbitService;
use crate::core::ConfigProvider;
use crate::domain::model::{Category, EntityId};
use crate::domain::ports::{AthleteStore, AuthProvider, Storage};
use crate::utils::error::{OrbitError, Result};
use crate::utils::validation::Validate;
use std::io::Read;

/// One CLI invocation: the service plus everything needed to present results.
pub struct App<A: AuthProvider, S: AthleteStore, T: Storage> {
    service: OrbitService<A, S, T>,
    cards: CardBuilder,
    renderer: Renderer,
    categories: Vec<Category>,
}

impl<A: AuthProvider, S: AthleteStore, T: Storage> App<A, S, T> {
    pub fn new(
        service: OrbitService<A, S, T>,
        cards: CardBuilder,
        renderer: Renderer,
        categories: Vec<Category>,
    ) -> Self {
        Self {
            service,
            cards,
            renderer,
            categories,
        }
    }

    pub async fn execute(&self, command: &Command) -> Result<String> {
        match command {
            Command::Login { email, password } => {
                let session = self.service.sign_in(email, password).await?;
                self.renderer.message(&format!(
                    "Signed in as {}",
                    session.user.email.as_deref().unwrap_or(email.as_str())
                ))
            }
            Command::Signup { email, password } => {
                match self.service.sign_up(email, password).await? {
                    Some(_) => self.renderer.message("Account created, you are signed in"),
                    None => self
                        .renderer
                        .message("Account created, check your email to confirm it"),
                }
            }
            Command::Logout => {
                self.service.sign_out().await?;
                self.renderer.message("Signed out")
            }
            Command::Whoami => {
                let session = self.service.current_session().await?;
                let user = self.service.current_user(&session).await?;
                self.renderer.user(&user)
            }
            Command::Feed => {
                let session = self.service.current_session().await?;
                let events = self.service.feed(&session).await;
                self.renderer.feed(&self.cards.feed(&events))
            }
            Command::Search {
                query,
                category,
                following,
            } => {
                if let Some(category) = category {
                    self.check_category(category)?;
                }
                let session = self.service.current_session().await?;
                let catalog = self.service.load_catalog(&session).await;
                let filter =
                    AthleteFilter::new(query.clone().unwrap_or_default(), category.as_deref());

                let rows = if *following {
                    catalog.orbit(&filter)
                } else {
                    catalog.search(&filter)
                };
                self.renderer.athletes(&rows)
            }
            Command::Athlete { id } => {
                let session = self.service.current_session().await?;
                let profile = self
                    .service
                    .athlete_profile(&session, &EntityId::from(id.as_str()))
                    .await?;
                self.renderer.profile(&self.cards.profile(&profile))
            }
            Command::Follow { id } => {
                let session = self.service.current_session().await?;
                self.service.follow(&session, &EntityId::from(id.as_str())).await?;
                self.renderer.message(&format!("Following {}", id))
            }
            Command::Unfollow { id } => {
                let session = self.service.current_session().await?;
                self.service.unfollow(&session, &EntityId::from(id.as_str())).await?;
                self.renderer.message(&format!("Unfollowed {}", id))
            }
            Command::Toggle { id } => {
                let session = self.service.current_session().await?;
                let id = EntityId::from(id.as_str());
                let mut follows = self.service.load_catalog(&session).await.followed;

                if !self.service.toggle_follow(&session, &mut follows, &id).await {
                    return Err(OrbitError::FollowUpdateFailed { id: id.to_string() });
                }
                let verb = if follows.contains(&id) { "Following" } else { "Unfollowed" };
                self.renderer.message(&format!("{} {}", verb, id))
            }
            Command::Categories => self.renderer.categories(&self.categories),
            Command::Format { file } => {
                let raw = match file {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => {
                        let mut buffer = String::new();
                        std::io::stdin().read_to_string(&mut buffer)?;
                        buffer
                    }
                };
                self.format_raw(&raw)
            }
        }
    }

    /// Formats one raw result payload; `null` or non-objects give no rows.
    pub fn format_raw(&self, raw: &str) -> Result<String> {
        let value: serde_json::Value = serde_json::from_str(raw.trim())?;
        let fields = self.cards.formatter().order_value(&value);
        self.renderer.fields(&fields)
    }

    fn check_category(&self, category: &str) -> Result<()> {
        if self
            .categories
            .iter()
            .any(|c| c.id.eq_ignore_ascii_case(category))
        {
            return Ok(());
        }
        let known: Vec<&str> = self.categories.iter().map(|c| c.id.as_str()).collect();
        Err(OrbitError::ValidationError {
            message: format!(
                "Unknown category '{}'. Known categories: {}",
                category,
                known.join(", ")
            ),
        })
    }
}

pub fn card_builder(config: &TomlConfig) -> CardBuilder {
    CardBuilder::new(ResultFormatter::new(config.formatter_rules()), config.date_format())
}

/// Resolves configuration, wires the backend client and runs the command.
pub async fn run(cli: &CliConfig) -> Result<String> {
    let config = cli.resolve()?;
    config.validate()?;
    tracing::debug!("Backend: {}", config.backend_url());

    if !cli.command.is_offline() {
        config.validate_backend()?;
    }

    // 離線指令也會建立 client，但不會送出任何請求
    let client = SupabaseClient::from_config(&config)?;
    let storage = LocalStorage::new(config.session_dir().to_string());
    let service = OrbitService::new(client.clone(), client, storage)
        .with_feed_limit(config.feed_limit());

    let app = App::new(
        service,
        card_builder(&config),
        Renderer::new(cli.format),
        config.categories(),
    );
    app.execute(&cli.command).await
}
