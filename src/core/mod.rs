//! Session client, polling and the backend's data model.

pub mod api;
pub mod envelope;
pub mod http;
pub mod logging;
pub mod models;
pub mod poller;
pub mod refresh_store;
pub mod renewal;
pub mod session;

pub use api::MetricsQuery;
pub use envelope::{ApiErrorBody, ApiResponse, ResponseMeta};
pub use models::{
    AuthTokens, Category, CategoryInfo, CategoryWithMetrics, ExportFormat, ImportSummary, Metric,
    Role, TimeRange, User,
};
pub use poller::{PollOptions, PollPhase, PollSnapshot, Poller, Visibility};
pub use refresh_store::{KeyringRefreshStore, MemoryRefreshStore, RefreshMode, RefreshStore};
pub use session::{SessionClient, SessionEvent, SessionOptions};
