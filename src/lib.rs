pub mod cli;
pub mod commands;
pub mod events;
pub mod exchange;
pub mod health;
pub mod logging;
pub mod markets;
pub mod math;
pub mod metrics;
pub mod orders;
pub mod strategy;
pub mod types;
