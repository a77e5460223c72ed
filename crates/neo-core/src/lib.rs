pub mod config;
pub mod dates;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod model;
pub mod retry;
pub mod storage;
pub mod uploader;

#[cfg(test)]
mod testing;
