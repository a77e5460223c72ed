use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::Sha256;
use std::collections::BTreeMap;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const STORAGE_VERSION: &str = "2021-08-06";

const RFC1123_FORMAT: &str =
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT";

/// Parts of a request that take part in Shared Key signing.
pub(crate) struct SignedRequest<'a> {
    pub(crate) method: &'a str,
    pub(crate) url: &'a Url,
    pub(crate) content_length: usize,
    pub(crate) content_type: Option<&'a str>,
    /// `x-ms-*` headers, lower-cased.
    pub(crate) ms_headers: &'a BTreeMap<String, String>,
}

pub(crate) fn x_ms_date(now: OffsetDateTime) -> String {
    let format = time::format_description::parse(RFC1123_FORMAT);
    format
        .ok()
        .and_then(|format| now.format(&format).ok())
        .unwrap_or_else(|| now.unix_timestamp().to_string())
}

pub(crate) fn string_to_sign(account: &str, request: &SignedRequest<'_>) -> String {
    let content_length = if request.content_length == 0 {
        String::new()
    } else {
        request.content_length.to_string()
    };
    let mut lines = vec![
        request.method.to_string(),
        String::new(), // Content-Encoding
        String::new(), // Content-Language
        content_length,
        String::new(), // Content-MD5
        request.content_type.unwrap_or_default().to_string(),
        String::new(), // Date
        String::new(), // If-Modified-Since
        String::new(), // If-Match
        String::new(), // If-None-Match
        String::new(), // If-Unmodified-Since
        String::new(), // Range
    ];
    for (name, value) in request.ms_headers {
        lines.push(format!("{name}:{}", value.trim()));
    }
    lines.push(canonicalized_resource(account, request.url));
    lines.join("\n")
}

fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}{}", url.path());
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        resource.push_str(&format!("\n{name}:{}", values.join(",")));
    }
    resource
}

pub(crate) fn shared_key_authorization(
    account: &str,
    key: &[u8],
    request: &SignedRequest<'_>,
) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|err| format!("invalid account key: {err}"))?;
    mac.update(string_to_sign(account, request).as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("SharedKey {account}:{signature}"))
}
