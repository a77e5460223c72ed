use crate::dates::format_date;
use crate::error::NeoError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use time::Date;

/// One response unit of the feed. Date groups keep the order the feed sent them in.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub element_count: Option<u64>,
    #[serde(default, deserialize_with = "date_groups_in_feed_order")]
    pub near_earth_objects: Vec<(String, Vec<NeoRecord>)>,
    #[serde(default)]
    pub links: Option<PageLinks>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

impl FeedPage {
    pub fn from_value(value: Value) -> Result<Self, NeoError> {
        serde_json::from_value(value)
            .map_err(|err| NeoError::Malformed(format!("unexpected feed page shape: {err}")))
    }

    pub fn next_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_deref())
            .filter(|next| !next.trim().is_empty())
    }

    /// Flattens the date mapping into `(date, record)` pairs.
    pub fn records(&self) -> impl Iterator<Item = (&str, &NeoRecord)> {
        self.near_earth_objects
            .iter()
            .flat_map(|(date, records)| records.iter().map(move |record| (date.as_str(), record)))
    }

    pub fn record_count(&self) -> usize {
        self.near_earth_objects
            .iter()
            .map(|(_, records)| records.len())
            .sum()
    }
}

fn date_groups_in_feed_order<'de, D>(
    deserializer: D,
) -> Result<Vec<(String, Vec<NeoRecord>)>, D::Error>
where
    D: Deserializer<'de>,
{
    let groups = Map::<String, Value>::deserialize(deserializer)?;
    groups
        .into_iter()
        .map(|(date, records)| {
            let records = Vec::<NeoRecord>::deserialize(records).map_err(serde::de::Error::custom)?;
            Ok((date, records))
        })
        .collect()
}

/// An opaque NEO document. Only `id` is ever inspected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeoRecord(Value);

impl NeoRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn blob_name(&self) -> Option<String> {
        self.id().map(|id| format!("{id}.json"))
    }

    pub fn to_pretty_json(&self) -> Result<String, NeoError> {
        serde_json::to_string_pretty(&self.0)
            .map_err(|err| NeoError::Fatal(format!("serialize record: {err}")))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub start_date: Date,
    pub end_date: Date,
    pub api_key: String,
}

impl FeedRequest {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("start_date".to_string(), format_date(self.start_date)),
            ("end_date".to_string(), format_date(self.end_date)),
            ("api_key".to_string(), self.api_key.clone()),
        ]
    }
}

impl fmt::Debug for FeedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedRequest")
            .field("start_date", &format_date(self.start_date))
            .field("end_date", &format_date(self.end_date))
            .field("api_key", &"<redacted>")
            .finish()
    }
}
