// Subscription tracking core - models, storage, alerts, the lot
pub mod alerts;
pub mod backup;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod files;
pub mod handle;
pub mod models;
pub mod settings;
pub mod stats;
pub mod store;
pub mod validation;

pub use alerts::{Alert, AlertEngine, AlertKind, AlertSummary, Priority};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::Error;
pub use export::{ExportFormat, Exporter};
pub use handle::SharedStore;
pub use models::{NewSubscription, Status, Subscription, SubscriptionUpdate, DEFAULT_CATEGORY};
pub use settings::{MailSettings, Settings, SettingsData};
pub use stats::{CategoryStat, Statistics};
pub use store::{SubscriptionStore, ALL_CATEGORIES};
pub use validation::DateValidator;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
