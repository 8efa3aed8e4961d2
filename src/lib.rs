pub mod ai;
pub mod clock;
pub mod constants;
pub mod cues;
pub mod engine;
pub mod error;
pub mod fighter;
pub mod input;
pub mod rng;
pub mod server_protocol;
pub mod telemetry;
pub mod types;
