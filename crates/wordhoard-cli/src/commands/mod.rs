pub mod add;
pub mod answer;
pub mod auth;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod dict;
pub mod edit;
pub mod export;
pub mod favorite;
pub mod list;
pub mod show;
pub mod sync;
pub mod tag;
pub mod watch;
