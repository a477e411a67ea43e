pub mod api;
pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod oauth;
pub mod period;
pub mod publisher;
pub mod ranking;
pub mod scheduled;
pub mod storage;
pub mod types;
