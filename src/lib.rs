pub mod config;
pub mod error;
pub mod exclusion;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod scoring;
