pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LocalStorage, SessionStore, SupabaseClient};
pub use config::{toml_config::TomlConfig, CliConfig, Command, OutputFormat};
pub use core::cards::CardBuilder;
pub use core::formatter::{
    format_label, format_value, order_fields, ordinal, sort_priority, ResultFormatter,
};
pub use core::service::OrbitService;
pub use domain::model::{DisplayField, ResultRecord};
pub use utils::error::{OrbitError, Result};
