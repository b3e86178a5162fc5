// Library for tests to access modules

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod message_store;
pub mod models;
pub mod monitor;
pub mod probe;
pub mod render;
pub mod routes;
pub mod scheduler;
pub mod sysinfo_repo;
pub mod transport;
pub mod version;
