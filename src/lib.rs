pub mod config;
pub mod controller;
pub mod debug_report;
pub mod errors;
pub mod execute;
pub mod http_request_executor;
pub mod recording;
pub mod recording_store;
pub mod rpc_client;
pub mod transcript_parser;
