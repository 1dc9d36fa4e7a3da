//! Services shared by the sync engine and the clients.

mod local_store;
mod words;

pub use local_store::{LocalStore, ReconcileReport};
pub use words::{WordService, WordUpdate};
