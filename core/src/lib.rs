pub mod db;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod models;
pub mod notifier;
pub mod schedule;
pub mod service;
pub mod settings;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
pub use service::TrackerService;
