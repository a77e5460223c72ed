use crate::logging;
use anyhow::Context;
use clap::{CommandFactory, Parser};
use neo_core::config::IngestConfig;
use neo_core::dates::{DateError, format_date, parse_date, today};
use neo_core::ingest::{IngestSummary, run_ingest};
use neo_core::model::FeedRequest;
use neo_core::retry::ThreadSleep;
use neo_providers::{AzureBlobStore, HttpFeedTransport};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::Date;
use tracing::{error, info};

mod app;
mod args;

use args::*;

pub(crate) const EXIT_OK: u8 = 0;
pub(crate) const EXIT_FAILURE: u8 = 1;

pub fn run() -> u8 {
    app::run()
}
