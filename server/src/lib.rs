//! Backyard library
//!
//! Idea-map notes service: the HTTP API and its services, the canvas core
//! (mapping, layout, interaction) and the client-side cache that drives it.

pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod ideamap;
pub mod services;
