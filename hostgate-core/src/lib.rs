//! Hostgate Core - edge routing and access control for multi-tenant site hosting
//!
//! Every request is classified by host and path and answered with exactly one
//! routing decision: pass through, redirect, or an internal rewrite into the
//! marketing, application or tenant namespace of the rendering upstream.

pub mod api;
pub mod cache;
pub mod config;
pub mod credential;
pub mod domain;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod proxy;
pub mod repository;
pub mod routing;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
