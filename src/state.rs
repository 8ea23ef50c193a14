use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::modules::jobs::store::JobStore;
use crate::scheduler::SchedulerHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jobs: Arc<JobStore>,
    pub scheduler: SchedulerHandle,
}

impl AppState {
    pub fn new(config: AppConfig, jobs: Arc<JobStore>, scheduler: SchedulerHandle) -> Self {
        Self {
            config,
            jobs,
            scheduler,
        }
    }
}
