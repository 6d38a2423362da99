use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::template::{create_template_store, TemplateService, TemplateStore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub template_service: Arc<TemplateService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let template_service = Arc::new(TemplateService::new(
            create_template_store(),
            settings.render.max_depth,
        ));

        Self {
            settings: Arc::new(settings),
            template_service,
            start_time: Instant::now(),
        }
    }

    pub fn store(&self) -> &TemplateStore {
        self.template_service.store()
    }
}
