use std::sync::Arc;

use crate::application::preview::PreviewService;
use crate::application::settings::SettingsService;

#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<SettingsService>,
    pub preview: Arc<PreviewService>,
}
