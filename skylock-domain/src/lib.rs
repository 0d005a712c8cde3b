pub mod booking;
pub mod error;
pub mod events;
pub mod flight;
pub mod ledger;
pub mod lock;

pub use error::ReservationError;
pub use ledger::{InventoryLedger, LockStore};
