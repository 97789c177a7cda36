//! seisan-extract: client for the hosted vision model that turns a scanned
//! receipt PDF into structured records.

pub mod client;
pub mod prompt;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, FileState, GeminiClient, PollPolicy, UploadedFile,
    extract_from_pdf, parse_records,
};
