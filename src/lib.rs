pub mod config;
pub mod dispatcher;
pub mod enricher;
pub mod fetcher;
pub mod identity;
pub mod merge;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod sources;
pub mod state;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use dispatcher::EnrichmentDispatcher;
pub use enricher::{GeminiEnricher, MockEnricher};
pub use fetcher::Fetcher;
pub use identity::item_id;
pub use merge::{merge, MergeOutcome};
pub use notify::{LogNotifier, NoopNotifier};
pub use pipeline::{NewsPipeline, RefreshOutcome};
pub use scheduler::RefreshScheduler;
pub use sources::RssFeedSource;
pub use state::SnapshotStore;
pub use traits::{Enricher, FeedSource, NotificationPermission, Notifier};
pub use types::*;
