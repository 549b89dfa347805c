//! Library exports for the URL shortener application
//!
//! This module exposes internal components for testing and for the binary.

pub mod analytics;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod oauth;
pub mod route;
