// Library root: re-exports all modules so integration tests and the
// command-line front end can access the crate's public API.

pub mod catalog;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod store;

pub use error::DraftError;
