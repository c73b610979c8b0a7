//! Remote prompt service client

pub mod envelope;
pub mod http;
pub mod service;

pub use http::HttpPromptClient;
pub use service::PromptService;
