pub mod backoff;
pub mod config;
pub mod error;
pub mod subscription;
