//! Mock resolution: the public fetch surface

mod engine;
mod response;

pub use engine::{FetchResult, Mocker};
pub use response::{FetchFailure, FetchOptions, MockResponse, ResponseSource};
