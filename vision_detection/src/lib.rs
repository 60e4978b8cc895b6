mod inference_service;
mod server;

pub mod client;
pub mod config;
pub mod decoder;
pub mod detection;
pub mod error;
pub mod objects;
pub mod telemetry;

pub use server::{start_server, BoxError, GrpcServer};
