//! Library crate for cam-probe-rs exposing reusable modules.
pub mod candidates;
pub mod discovery;
pub mod jobs;
pub mod netdetect;
pub mod onvif;
pub mod probe;
pub mod report;
pub mod server;
pub mod types;
pub mod vendors;
