pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod oracle;
pub mod providers;
pub mod risk;
