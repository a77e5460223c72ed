use crate::azure_auth::{STORAGE_VERSION, SignedRequest, shared_key_authorization, x_ms_date};
use crate::azure_conn::{Credential, StorageAccount, parse_connection_string};
use crate::http::{build_client, status_message, transport_error};
use neo_core::error::NeoError;
use neo_core::storage::{BlobStore, ContainerStatus};
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use std::collections::BTreeMap;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

/// Azure Blob Storage over the REST API.
pub struct AzureBlobStore {
    client: Client,
    account: StorageAccount,
}

impl AzureBlobStore {
    pub fn new(account: StorageAccount, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            account,
        })
    }

    pub fn from_connection_string(input: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::new(parse_connection_string(input)?, timeout)
    }

    pub fn account(&self) -> &StorageAccount {
        &self.account
    }

    fn resource_url(&self, segments: &[&str]) -> Result<Url, NeoError> {
        let mut url = self.account.blob_endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| NeoError::Fatal("blob endpoint cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn put(
        &self,
        mut url: Url,
        body: &[u8],
        content_type: Option<&str>,
        mut ms_headers: BTreeMap<String, String>,
    ) -> Result<Response, NeoError> {
        let request_id = Uuid::new_v4().to_string();
        ms_headers.insert("x-ms-client-request-id".to_string(), request_id.clone());
        ms_headers.insert("x-ms-date".to_string(), x_ms_date(OffsetDateTime::now_utc()));
        ms_headers.insert("x-ms-version".to_string(), STORAGE_VERSION.to_string());

        let authorization = match &self.account.credential {
            Credential::SharedKey(key) => {
                let signed = SignedRequest {
                    method: Method::PUT.as_str(),
                    url: &url,
                    content_length: body.len(),
                    content_type,
                    ms_headers: &ms_headers,
                };
                let header = shared_key_authorization(&self.account.name, key, &signed)
                    .map_err(NeoError::Fatal)?;
                Some(header)
            }
            Credential::Sas(sas) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{existing}&{sas}"),
                    _ => sas.clone(),
                };
                url.set_query(Some(&query));
                None
            }
        };

        debug!(path = url.path(), request_id, "azure blob request");
        let mut builder = self
            .client
            .request(Method::PUT, url)
            .header(CONTENT_LENGTH, body.len())
            .body(body.to_vec());
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        for (name, value) in &ms_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.send().map_err(|err| {
            warn!(request_id, "azure blob request did not complete");
            transport_error(err)
        })
    }
}

impl BlobStore for AzureBlobStore {
    fn ensure_container(&self, container: &str) -> Result<ContainerStatus, NeoError> {
        let mut url = self.resource_url(&[container])?;
        url.query_pairs_mut().append_pair("restype", "container");
        let response = self.put(url, &[], None, BTreeMap::new())?;
        match response.status() {
            StatusCode::CREATED => Ok(ContainerStatus::Created),
            StatusCode::CONFLICT => Ok(ContainerStatus::AlreadyExists),
            status if status.is_success() => Ok(ContainerStatus::Created),
            _ => Err(error_from_response(response)),
        }
    }

    fn put_blob(
        &self,
        container: &str,
        name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), NeoError> {
        let url = self.resource_url(&[container, name])?;
        let mut ms_headers = BTreeMap::new();
        ms_headers.insert("x-ms-blob-type".to_string(), "BlockBlob".to_string());
        let response = self.put(url, content, Some(content_type), ms_headers)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response))
    }
}

fn error_from_response(response: Response) -> NeoError {
    let status = response.status();
    let code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let request_id = response
        .headers()
        .get("x-ms-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let body = response.text().unwrap_or_default();
    warn!(%status, code = ?code, request_id = ?request_id, "azure blob request failed");
    let message = match code {
        Some(code) => format!("{code} ({})", status_message(status, "")),
        None => status_message(status, &body),
    };
    classify_status(status, message)
}

pub(crate) fn classify_status(status: StatusCode, message: String) -> NeoError {
    match status {
        StatusCode::NOT_FOUND => NeoError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NeoError::Fatal(message),
        _ => NeoError::Transient(message),
    }
}
