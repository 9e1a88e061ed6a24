pub mod appresult;
pub mod config;
pub mod hub;
pub mod protocol;
pub mod rooms;

use std::sync::{Arc, OnceLock};

use axum::{extract::FromRef, http::{HeaderValue, Method}, Router};
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use tower_http::cors::CorsLayer;

pub use appresult::{AppError, AppResult};
pub use config::{Config, HubConfig};
pub use hub::{Hub, HubError};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub hub: Hub,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            hub: Hub::new(&config.hub),
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> anyhow::Result<Router> {
    let origin: HeaderValue = state.config.allowed_origin.parse()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true);

    Ok(Router::new()
        .merge(rooms::router())
        .with_state(state)
        .layer(cors))
}

/// Milliseconds since the Unix epoch, the unit clients use for expiry deadlines.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Pins the host's UTC offset for [`clock_label`]. The OS offset can only be read while the
/// process is single-threaded, so call this before starting the runtime. Without it stamps are UTC.
pub fn capture_local_offset() {
    if let Ok(offset) = UtcOffset::current_local_offset() {
        let _ = LOCAL_OFFSET.set(offset);
    }
}

/// `HH:MM:SS` local wall-clock stamp put on system notices and file deliveries.
pub fn clock_label() -> String {
    let offset = LOCAL_OFFSET.get().copied().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc()
        .to_offset(offset)
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}
