//! Product Image Pipeline
//!
//! Accepts CSV files of products and image URLs, compresses every image,
//! uploads the results to Google Drive, and writes the resulting URLs back
//! into the CSV. Progress of each upload is tracked by a request id.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
