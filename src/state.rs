use std::sync::{Arc, PoisonError, RwLock};

use crate::config::AppConfig;
use crate::db::Pool;
use crate::models::BusinessHours;
use crate::services::clock::Clock;

pub struct AppState {
    pub db: Pool,
    pub config: AppConfig,
    /// Current business-hours snapshot. Replaced wholesale when settings change.
    pub hours: RwLock<Arc<BusinessHours>>,
    pub clock: Box<dyn Clock>,
}

impl AppState {
    pub fn new(db: Pool, config: AppConfig, hours: BusinessHours, clock: Box<dyn Clock>) -> Self {
        Self {
            db,
            config,
            hours: RwLock::new(Arc::new(hours)),
            clock,
        }
    }

    pub fn hours(&self) -> Arc<BusinessHours> {
        let guard = self.hours.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn replace_hours(&self, hours: BusinessHours) {
        let mut guard = self.hours.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(hours);
    }
}
