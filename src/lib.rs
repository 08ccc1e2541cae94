pub mod configuration;
pub mod domain;
pub mod dtos;
pub mod handlers;
pub mod helper;
pub mod ports;
pub mod repositories;
pub mod startup;
pub mod telemetry;
