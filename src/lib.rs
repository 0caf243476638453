pub mod binaries;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod ids;
pub mod ingest;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod process;
pub mod refdata;
