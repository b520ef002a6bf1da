pub mod alerts;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use error::{NavError, NavResult};
