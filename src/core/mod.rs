pub mod batch;
pub mod cache;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod protocol;
pub mod resolver;
pub mod stress;
pub mod traits;
