use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::config::{AnalysisConfig, AppConfig};
use crate::storage::RowSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn RowSource>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(source: Arc<dyn RowSource>, config: AppConfig) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }

    /// Analyzer over the shared source, pinned to the configured reference date if any.
    pub fn analyzer(&self) -> Analyzer<dyn RowSource> {
        let analyzer = Analyzer::new(Arc::clone(&self.source));
        match self.config.reference_date {
            Some(date) => analyzer.with_reference_date(date),
            None => analyzer,
        }
    }

    pub fn defaults(&self) -> &AnalysisConfig {
        &self.config.analysis
    }
}
