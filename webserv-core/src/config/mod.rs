//! Configuration model
//!
//! The tree produced by the configuration compiler: one [`HttpConfig`] owning
//! its [`ServerConfig`]s, each owning its [`LocationConfig`]s.

mod http;
mod loader;
mod location;
mod server;
mod values;

pub use http::HttpConfig;
pub use loader::{ConfigLoader, SnapshotFormat};
pub use location::{
    CgiConfig, HeaderEntry, LocationConfig, LocationMatch, ReturnAction, UploadConfig,
    DEFAULT_CGI_EXTENSION,
};
pub use server::{ListenAddr, ServerConfig};
pub use values::{HttpMethod, Size, StatusClass, StatusCode, UploadAccess};

use std::collections::BTreeMap;

/// Error code to URI mapping shared by all three scopes
pub type ErrorPages = BTreeMap<StatusCode, String>;

/// Largest request body any scope may accept
pub const MAX_BODY_SIZE: Size = Size::mib(100);

/// Default request body limit
pub const DEFAULT_BODY_SIZE: Size = Size::mib(1);

pub(crate) fn default_index() -> Vec<String> {
    vec!["index.html".to_string(), "index.htm".to_string()]
}

/// Serialize error pages with string keys so that every snapshot format
/// (TOML included) can represent them.
pub(crate) mod error_pages_serde {
    use super::{ErrorPages, StatusCode};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(pages: &ErrorPages, serializer: S) -> Result<S::Ok, S::Error> {
        pages
            .iter()
            .map(|(code, uri)| (code.to_string(), uri.as_str()))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ErrorPages, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(code, uri)| {
                let numeric: u16 = code
                    .parse()
                    .map_err(|_| D::Error::custom(format!("invalid error code '{}'", code)))?;
                let status = StatusCode::error(numeric).map_err(D::Error::custom)?;
                Ok((status, uri))
            })
            .collect()
    }
}
