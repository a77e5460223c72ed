use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use std::collections::HashMap;
use std::fmt;

pub(crate) const DEV_ACCOUNT: &str = "devstoreaccount1";
pub(crate) const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    SharedKey(Vec<u8>),
    /// SAS query string without the leading `?`, already percent-encoded.
    Sas(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey(_) => f.write_str("SharedKey(<redacted>)"),
            Credential::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub name: String,
    pub blob_endpoint: Url,
    pub credential: Credential,
}

impl fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credential = match self.credential {
            Credential::SharedKey(_) => "shared-key",
            Credential::Sas(_) => "sas",
        };
        f.debug_struct("StorageAccount")
            .field("name", &self.name)
            .field("blob_endpoint", &self.blob_endpoint.as_str())
            .field("credential", &credential)
            .finish()
    }
}

impl StorageAccount {
    pub fn development() -> anyhow::Result<Self> {
        Ok(Self {
            name: DEV_ACCOUNT.to_string(),
            blob_endpoint: Url::parse(DEV_BLOB_ENDPOINT).context("parse development endpoint")?,
            credential: Credential::SharedKey(decode_key(DEV_ACCOUNT_KEY)?),
        })
    }
}

/// Parses an Azure Storage connection string
/// (`AccountName=...;AccountKey=...;EndpointSuffix=...`, `BlobEndpoint=...;SharedAccessSignature=...`
/// or `UseDevelopmentStorage=true`).
pub fn parse_connection_string(input: &str) -> anyhow::Result<StorageAccount> {
    let mut values = HashMap::new();
    for part in input.split(';').map(str::trim).filter(|part| !part.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            bail!("connection string segment is missing '=': {}", key_hint(part));
        };
        values.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }
    if values.is_empty() {
        bail!("connection string is empty");
    }

    if values
        .get("usedevelopmentstorage")
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    {
        return StorageAccount::development();
    }

    let account_name = values.get("accountname").cloned();
    let blob_endpoint = match values.get("blobendpoint") {
        Some(endpoint) => Url::parse(endpoint).context("parse BlobEndpoint")?,
        None => {
            let Some(name) = account_name.as_deref() else {
                bail!("connection string needs AccountName or BlobEndpoint");
            };
            let protocol = values
                .get("defaultendpointsprotocol")
                .map(String::as_str)
                .unwrap_or("https");
            let suffix = values
                .get("endpointsuffix")
                .map(String::as_str)
                .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
            Url::parse(&format!("{protocol}://{name}.blob.{suffix}"))
                .context("build blob endpoint")?
        }
    };

    let name = match account_name {
        Some(name) => name,
        None => blob_endpoint
            .host_str()
            .and_then(|host| host.split('.').next())
            .filter(|label| !label.is_empty())
            .map(ToString::to_string)
            .context("derive account name from BlobEndpoint")?,
    };

    let credential = if let Some(key) = values.get("accountkey") {
        Credential::SharedKey(decode_key(key)?)
    } else if let Some(sas) = values.get("sharedaccesssignature") {
        Credential::Sas(sas.trim_start_matches('?').to_string())
    } else {
        bail!("connection string needs AccountKey or SharedAccessSignature");
    };

    Ok(StorageAccount {
        name,
        blob_endpoint,
        credential,
    })
}

fn decode_key(key: &str) -> anyhow::Result<Vec<u8>> {
    STANDARD
        .decode(key)
        .context("AccountKey is not valid base64")
}

fn key_hint(part: &str) -> String {
    part.chars().take(16).collect()
}
