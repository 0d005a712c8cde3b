pub mod manager;
pub mod notifier;
pub mod orchestrator;

pub use manager::LockManager;
pub use notifier::Notifier;
pub use orchestrator::ReservationOrchestrator;
