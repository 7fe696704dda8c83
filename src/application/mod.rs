//! Application layer - generation use cases built on top of the ports

pub mod dto;
pub mod ports;
pub mod services;
