use super::*;
use clap::error::ErrorKind;

pub(super) fn run() -> u8 {
    logging::init();

    match Cli::try_parse() {
        Ok(cli) => run_cli(&cli, today()),
        Err(err) => handle_parse_error(&err, &mut io::stdout()),
    }
}

/// Everything after argument parsing. `today` is the default end date.
pub(super) fn run_cli(cli: &Cli, today: Date) -> u8 {
    let dates = resolve_dates(&cli.start_date, cli.end_date.as_deref(), today);
    let (start_date, end_date) = match dates {
        Ok(dates) => dates,
        Err(err) => {
            error!(
                critical = true,
                error = %err,
                "the date provided is not valid; use YYYY-MM-DD format"
            );
            return EXIT_FAILURE;
        }
    };

    match execute(cli, start_date, end_date) {
        Ok(_) => EXIT_OK,
        Err(err) => {
            error!(
                critical = true,
                error = format!("{err:#}"),
                "an unexpected error occurred during execution"
            );
            EXIT_FAILURE
        }
    }
}

/// Help and version requests exit cleanly; any other parse failure writes the
/// usage line to `out`.
pub(super) fn handle_parse_error(err: &clap::Error, out: &mut dyn Write) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            EXIT_OK
        }
        _ => {
            let _ = writeln!(out, "{}", usage());
            EXIT_FAILURE
        }
    }
}

pub(super) fn usage() -> String {
    Cli::command().render_usage().to_string()
}

pub(super) fn resolve_dates(
    start: &str,
    end: Option<&str>,
    today: Date,
) -> Result<(Date, Date), DateError> {
    let start_date = parse_date(start)?;
    let end_date = match end {
        Some(end) => parse_date(end)?,
        None => today,
    };
    Ok((start_date, end_date))
}

pub(super) fn load_config(
    path: Option<&Path>,
    feed_url: Option<&str>,
) -> anyhow::Result<IngestConfig> {
    let mut config = match path {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    if let Some(feed_url) = feed_url {
        config.feed_url = feed_url.to_string();
    }
    Ok(config)
}

fn execute(cli: &Cli, start_date: Date, end_date: Date) -> anyhow::Result<IngestSummary> {
    let config = load_config(cli.config.as_deref(), cli.feed_url.as_deref())?;
    let request = FeedRequest {
        start_date,
        end_date,
        api_key: cli.api_key.clone(),
    };
    let transport = HttpFeedTransport::new(config.request_timeout())?;
    let store =
        AzureBlobStore::from_connection_string(&cli.connection_string, config.request_timeout())
            .context("initialize blob storage client")?;

    info!(
        start_date = %format_date(start_date),
        end_date = %format_date(end_date),
        account = %store.account().name,
        container = %cli.container,
        "starting NEO ingest"
    );
    let options = config.ingest_options(&cli.container);
    let summary = run_ingest(transport, &store, &request, &options, &ThreadSleep)?;
    if summary.skipped() == 0 {
        info!("all NEO data has been uploaded successfully");
    } else {
        info!(skipped = summary.skipped(), "NEO ingest finished with skipped records");
    }
    Ok(summary)
}
