//! Assessment scoring and recommendation engine.
//!
//! A [`models::Catalog`] describes an assessment as data. A
//! [`session::Session`] walks it one prompt at a time, and an
//! [`engine::Engine`] turns a completed session into a deterministic
//! [`result::AssessmentResult`].

pub mod app;
pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod models;
pub mod ranking;
pub mod rationale;
pub mod report;
pub mod result;
pub mod scoring;
pub mod session;
pub mod store;

pub use engine::Engine;
pub use error::EngineError;

#[cfg(test)]
pub mod test_utils;
