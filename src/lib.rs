//! Mockfetch - record-and-replay interception layer for HTTP fetch calls
//!
//! A [`Mocker`] sits in front of a live HTTP call. With mocking enabled it
//! answers from registered static mocks or previously captured responses;
//! otherwise it calls through and, if asked to, captures the outcome to a
//! JSON file for later replay.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod mocker;
pub mod network;
pub mod registry;
pub mod replay;
pub mod storage;

pub use config::{MockerConfig, MockerOptions};
pub use error::{MockerError, Result};
pub use mocker::{FetchFailure, FetchOptions, FetchResult, MockResponse, Mocker, ResponseSource};
pub use registry::MockEntry;
