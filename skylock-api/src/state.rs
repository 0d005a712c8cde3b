use std::sync::Arc;

use skylock_engine::ReservationOrchestrator;
use skylock_store::app_config::{AuthConfig, BusinessRules};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReservationOrchestrator>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}
