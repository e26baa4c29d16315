//! Adapters binding the domain ports to external tools and services.

pub mod mock;
pub mod ollama;
pub mod tools;
