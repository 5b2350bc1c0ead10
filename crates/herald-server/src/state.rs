use herald_client::{ConfiguredAllowlist, NewsEngine};
use herald_core::traits::LabelGeocoder;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub engine: NewsEngine,
    pub allowlist: ConfiguredAllowlist,
    pub geocoder: LabelGeocoder,
}
