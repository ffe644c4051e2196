#![deny(missing_docs)]

//! Core library for the docsum document summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Plain-text extraction for PDF and DOCX uploads.
pub mod document;
/// Structured logging and tracing setup.
pub mod logging;
/// Request metrics helpers.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Summarization and analysis backend clients.
pub mod summarization;
/// Transient storage for uploaded files.
pub mod upload;
