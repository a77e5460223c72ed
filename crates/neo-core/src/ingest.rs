use crate::error::{IngestError, UploadError};
use crate::feed::{FeedTransport, Fetcher};
use crate::model::{FeedRequest, NeoRecord};
use crate::retry::{RetryPolicy, Sleep};
use crate::storage::{BlobStore, ContainerStatus};
use crate::uploader::Uploader;
use tracing::{error, info, warn};

#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub feed_url: String,
    pub container: String,
    pub fetch_policy: RetryPolicy,
    pub upload_policy: RetryPolicy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub pages: usize,
    pub records: usize,
    pub uploaded: usize,
    pub not_found: usize,
    pub failed: usize,
    pub missing_id: usize,
}

impl IngestSummary {
    pub fn skipped(&self) -> usize {
        self.not_found + self.failed + self.missing_id
    }
}

enum ItemOutcome {
    Uploaded,
    NotFound,
    Failed,
    MissingId,
}

/// Fetches every page for `request` and uploads each record as `{id}.json`.
/// Per-record failures are logged and counted; container setup and fetch
/// failures end the run. Blobs written before a failure stay in place.
pub fn run_ingest<T, S>(
    transport: T,
    store: S,
    request: &FeedRequest,
    options: &IngestOptions,
    sleeper: &dyn Sleep,
) -> Result<IngestSummary, IngestError>
where
    T: FeedTransport,
    S: BlobStore,
{
    let container = options.container.as_str();
    match store.ensure_container(container) {
        Ok(ContainerStatus::Created) => info!(container, "created container"),
        Ok(ContainerStatus::AlreadyExists) => warn!(container, "container already exists"),
        Err(source) => {
            return Err(IngestError::ContainerSetup {
                container: container.to_string(),
                source,
            });
        }
    }

    let fetcher = Fetcher::new(transport, options.fetch_policy, sleeper);
    let uploader = Uploader::new(&store, container, options.upload_policy, sleeper);
    let mut summary = IngestSummary::default();

    for page in fetcher.paginate(&options.feed_url, &request.query_pairs()) {
        let page = page.map_err(IngestError::Fetch)?;
        summary.pages += 1;
        info!(
            page = summary.pages,
            records = page.record_count(),
            element_count = ?page.element_count,
            "received feed page"
        );
        for (date, record) in page.records() {
            summary.records += 1;
            match upload_record(&uploader, date, record) {
                ItemOutcome::Uploaded => summary.uploaded += 1,
                ItemOutcome::NotFound => summary.not_found += 1,
                ItemOutcome::Failed => summary.failed += 1,
                ItemOutcome::MissingId => summary.missing_id += 1,
            }
        }
    }

    info!(
        pages = summary.pages,
        records = summary.records,
        uploaded = summary.uploaded,
        skipped = summary.skipped(),
        container,
        "ingest finished"
    );
    Ok(summary)
}

fn upload_record<S: BlobStore>(
    uploader: &Uploader<'_, S>,
    date: &str,
    record: &NeoRecord,
) -> ItemOutcome {
    let Some(blob) = record.blob_name() else {
        error!(date, "skipping record without an id");
        return ItemOutcome::MissingId;
    };
    let content = match record.to_pretty_json() {
        Ok(content) => content,
        Err(err) => {
            error!(blob, error = %err, "failed to serialize record");
            return ItemOutcome::Failed;
        }
    };
    match uploader.upload_with_retry(&blob, content.as_bytes()) {
        Ok(()) => {
            info!(blob, container = uploader.container(), "uploaded blob");
            ItemOutcome::Uploaded
        }
        Err(err @ UploadError::NotFound { .. }) => {
            error!(
                blob = err.blob(),
                error = %err,
                "failed to upload because the container or blob was not found"
            );
            ItemOutcome::NotFound
        }
        Err(err) => {
            error!(blob = err.blob(), error = %err, "failed to upload record");
            ItemOutcome::Failed
        }
    }
}
