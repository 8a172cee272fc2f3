//! Port traits the domain talks to; adapters implement them.

pub mod api_key_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
