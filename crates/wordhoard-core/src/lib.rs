//! wordhoard-core - Core library for Wordhoard
//!
//! This crate contains the models, the local word store, the remote document
//! store abstraction and the sync engine used by the Wordhoard clients.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Meaning, Scope, Word, WordId};
