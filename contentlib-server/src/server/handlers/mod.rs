pub mod assets;
pub mod blocks;
pub mod collections;
pub mod containers;
pub mod health;
pub mod libraries;
pub mod team;

use std::str::FromStr;

use contentlib::keys::{CollectionKey, KeyError, LibraryKey};
use serde::Deserialize;

use super::error::ApiResult;

/// Parse a key taken from the URL. Malformed keys surface as 404.
pub(crate) fn parse_key<K>(raw: &str) -> ApiResult<K>
where
    K: FromStr<Err = KeyError>,
{
    Ok(raw.parse::<K>()?)
}

#[derive(Debug, Deserialize)]
pub struct CollectionKeysRequest {
    pub collection_keys: Vec<String>,
}

impl CollectionKeysRequest {
    /// Accepts full collection keys or bare collection ids of the entity's library.
    pub(crate) fn resolve(&self, library_key: &LibraryKey) -> ApiResult<Vec<CollectionKey>> {
        self.collection_keys
            .iter()
            .map(|raw| {
                if raw.contains(':') {
                    parse_key(raw)
                } else {
                    Ok(library_key.collection_key(raw)?)
                }
            })
            .collect()
    }
}
