pub mod cards;
pub mod catalog;
pub mod formatter;
pub mod service;

pub use crate::domain::model::{DisplayField, ResultRecord};
pub use crate::domain::ports::{AthleteStore, AuthProvider, ConfigProvider, Storage};
pub use crate::utils::error::Result;
