//! Endpoints served by the router itself

pub mod health;
