use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use weather_service_cli::weather::OpenMeteoClient;

use crate::store::JobStore;

/// Cached autocomplete lookups: normalized query → (fetched at, suggestions).
pub type SuggestionCache = DashMap<String, (Instant, Vec<String>)>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub weather: Arc<OpenMeteoClient>,
    pub suggestions: Arc<SuggestionCache>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>, weather: OpenMeteoClient) -> Self {
        AppState {
            store,
            weather: Arc::new(weather),
            suggestions: Arc::new(DashMap::new()),
        }
    }
}
