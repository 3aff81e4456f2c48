//! Application state and shared resources.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use poster_common::{PosterResult, PosterSettings, ThemeCatalog};
use renderer::{CancelToken, PosterCompositor};

/// Shared application state.
pub struct AppState {
    pub settings: PosterSettings,
    pub themes: ThemeCatalog,
    pub compositor: Arc<PosterCompositor>,
    /// Set by `/api/cancel`, cleared when a generation starts.
    pub cancel: CancelToken,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Network-backed state from settings.
    pub fn new(settings: PosterSettings) -> PosterResult<Self> {
        let compositor = PosterCompositor::from_settings(&settings)?;
        Ok(Self::with_compositor(settings, compositor))
    }

    pub fn with_compositor(settings: PosterSettings, compositor: PosterCompositor) -> Self {
        Self {
            themes: ThemeCatalog::new(&settings.themes_dir),
            compositor: Arc::new(compositor),
            cancel: CancelToken::new(),
            metrics: None,
            settings,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
