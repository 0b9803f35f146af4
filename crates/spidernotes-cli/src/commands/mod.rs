pub mod account;
pub mod add;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod encryption;
pub mod export;
pub mod import;
pub mod list;
pub mod restore;
pub mod search;
pub mod sync;
