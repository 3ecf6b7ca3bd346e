//! Bilcekap Backend API Library
//!
//! This library provides the TIN validation service: a single HTTP endpoint
//! that checks a taxpayer identifier with the LHDN API and relays the result.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core models, validation and errors.
//! - `integrations`: External service integrations.
//! - `config`: Configuration management.
//! - `docs`: OpenAPI document and Swagger UI.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `lhdn_client`: LHDN API client.
//! - `models`: Request, response and upstream data models.
//! - `server`: Router assembly and server lifecycle.
//! - `validation`: Request input checks.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod config;
pub mod docs;
pub mod errors;
pub mod handlers;
pub mod lhdn_client;
pub mod models;
pub mod server;
pub mod validation;
