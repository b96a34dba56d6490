use history_metrics::MetricsService;
use history_store::HistoryStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HistoryStore>,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(store: Arc<dyn HistoryStore>, metrics: Arc<MetricsService>) -> Self {
        Self { store, metrics }
    }
}
