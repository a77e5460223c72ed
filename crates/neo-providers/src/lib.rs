mod azure_auth;
pub mod azure_blob;
pub mod azure_conn;
pub mod http;

pub use azure_blob::AzureBlobStore;
pub use azure_conn::{Credential, StorageAccount, parse_connection_string};
pub use http::HttpFeedTransport;
