pub mod aggregate;
pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod ingest;
pub mod mangle;
pub mod matcher;
pub mod model;
pub mod parsers;
pub mod report;
pub mod targets;
