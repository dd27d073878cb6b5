pub mod analysis;
pub mod asset;
pub mod metrics;
pub mod patterns;
pub mod recommend;
pub mod scoring;
pub mod service;
pub mod types;
