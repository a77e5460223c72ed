use super::*;

#[derive(Parser, Debug)]
#[command(
    name = "neo-sync",
    author,
    version,
    about = "Copy near-earth-object records from the NASA NeoWs feed into Azure Blob Storage"
)]
pub(super) struct Cli {
    #[arg(value_name = "NASA_API_KEY", help = "NASA API key")]
    pub(super) api_key: String,
    #[arg(
        value_name = "AZURE_STORAGE_CONNECTION_STRING",
        help = "Azure Storage connection string"
    )]
    pub(super) connection_string: String,
    #[arg(
        value_name = "START_DATE",
        help = "First day to fetch, e.g. 2024-03-01 or 3/1/2024"
    )]
    pub(super) start_date: String,
    #[arg(value_name = "CONTAINER_NAME", help = "Blob container to write into")]
    pub(super) container: String,
    #[arg(long, help = "Last day to fetch (defaults to today)")]
    pub(super) end_date: Option<String>,
    #[arg(long, help = "Override the feed endpoint")]
    pub(super) feed_url: Option<String>,
    #[arg(long, help = "JSON file with retry and timeout settings")]
    pub(super) config: Option<PathBuf>,
}
