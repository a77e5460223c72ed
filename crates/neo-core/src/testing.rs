use crate::error::NeoError;
use crate::feed::FeedTransport;
use crate::retry::Sleep;
use crate::storage::{BlobStore, ContainerStatus};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Call = (String, Vec<(String, String)>);

pub(crate) struct FakeTransport {
    responses: RefCell<VecDeque<Result<Value, NeoError>>>,
    calls: RefCell<Vec<Call>>,
}

impl FakeTransport {
    pub(crate) fn new(responses: Vec<Result<Value, NeoError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl FeedTransport for FakeTransport {
    fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value, NeoError> {
        self.calls
            .borrow_mut()
            .push((url.to_string(), query.to_vec()));
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(NeoError::Fatal("no scripted response".to_string())))
    }
}

#[derive(Default)]
pub(crate) struct RecordingSleep {
    delays: RefCell<Vec<Duration>>,
}

impl RecordingSleep {
    pub(crate) fn seconds(&self) -> Vec<u64> {
        self.delays.borrow().iter().map(Duration::as_secs).collect()
    }
}

impl Sleep for RecordingSleep {
    fn sleep(&self, delay: Duration) {
        self.delays.borrow_mut().push(delay);
    }
}

/// In-memory blob store with scripted per-blob failures.
#[derive(Default)]
pub(crate) struct MemoryStore {
    container_exists: bool,
    container_error: Option<NeoError>,
    failures: RefCell<HashMap<String, VecDeque<NeoError>>>,
    attempts: RefCell<HashMap<String, u32>>,
    put_order: RefCell<Vec<String>>,
    blobs: RefCell<BTreeMap<String, (String, Vec<u8>)>>,
}

impl MemoryStore {
    pub(crate) fn with_existing_container(mut self) -> Self {
        self.container_exists = true;
        self
    }

    pub(crate) fn with_container_error(mut self, err: NeoError) -> Self {
        self.container_error = Some(err);
        self
    }

    pub(crate) fn fail_with(&self, blob: &str, errors: Vec<NeoError>) {
        self.failures
            .borrow_mut()
            .insert(blob.to_string(), errors.into());
    }

    pub(crate) fn attempts(&self, blob: &str) -> u32 {
        self.attempts.borrow().get(blob).copied().unwrap_or(0)
    }

    pub(crate) fn blob(&self, blob: &str) -> Option<Vec<u8>> {
        self.blobs
            .borrow()
            .get(blob)
            .map(|(_, content)| content.clone())
    }

    /// Blob names in the order their first attempt arrived.
    pub(crate) fn put_order(&self) -> Vec<String> {
        self.put_order.borrow().clone()
    }

    pub(crate) fn blob_names(&self) -> Vec<String> {
        self.blobs.borrow().keys().cloned().collect()
    }
}

impl BlobStore for MemoryStore {
    fn ensure_container(&self, _container: &str) -> Result<ContainerStatus, NeoError> {
        if let Some(err) = &self.container_error {
            return Err(err.clone());
        }
        if self.container_exists {
            Ok(ContainerStatus::AlreadyExists)
        } else {
            Ok(ContainerStatus::Created)
        }
    }

    fn put_blob(
        &self,
        container: &str,
        name: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<(), NeoError> {
        let mut attempts = self.attempts.borrow_mut();
        let count = attempts.entry(name.to_string()).or_insert(0);
        if *count == 0 {
            self.put_order.borrow_mut().push(name.to_string());
        }
        *count += 1;
        drop(attempts);
        if let Some(err) = self
            .failures
            .borrow_mut()
            .get_mut(name)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        self.blobs
            .borrow_mut()
            .insert(name.to_string(), (container.to_string(), content.to_vec()));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a plain-text subscriber and returns everything it logged.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
