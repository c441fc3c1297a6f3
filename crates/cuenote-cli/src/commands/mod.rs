//! Command handlers

pub mod annotate;
pub mod config;
pub mod layer;
pub mod stats;
pub mod status;
pub mod template;
pub mod transfer;
