use std::sync::Arc;

use crate::{orchestrator::Orchestrator, settings::SettingsStore, tabs::BrowserTabs};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub settings: Arc<dyn SettingsStore>,
    pub tabs: Arc<BrowserTabs>,
}
