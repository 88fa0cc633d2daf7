use std::str::FromStr;

/// Limits and policy knobs for the library gateway. Passed explicitly into
/// [`crate::LibraryGateway`]; nothing reads configuration from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Upper bound for a single static asset.
    pub max_asset_size_bytes: usize,
    /// Live components allowed per library.
    pub max_components_per_library: u64,
    /// First ordering index handed to structural topics.
    pub general_topic_reserve: i32,
    /// Events buffered per broadcast channel before slow subscribers lag.
    pub event_buffer_size: usize,
    /// Chunk size used when streaming asset bytes.
    pub asset_chunk_size: usize,
    /// Lets any active user view public-read libraries from authoring tools.
    pub public_read_for_authors: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_asset_size_bytes: 20 * 1024 * 1024,
            max_components_per_library: 1_000,
            general_topic_reserve: 100,
            event_buffer_size: 1_024,
            asset_chunk_size: 64 * 1024,
            public_read_for_authors: false,
        }
    }
}

impl LibraryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_asset_size_bytes: env_or(
                "CONTENTLIB_MAX_ASSET_SIZE_BYTES",
                defaults.max_asset_size_bytes,
            ),
            max_components_per_library: env_or(
                "CONTENTLIB_MAX_COMPONENTS_PER_LIBRARY",
                defaults.max_components_per_library,
            ),
            general_topic_reserve: env_or(
                "CONTENTLIB_GENERAL_TOPIC_RESERVE",
                defaults.general_topic_reserve,
            ),
            event_buffer_size: env_or("CONTENTLIB_EVENT_BUFFER_SIZE", defaults.event_buffer_size),
            asset_chunk_size: env_or("CONTENTLIB_ASSET_CHUNK_SIZE", defaults.asset_chunk_size),
            public_read_for_authors: env_or(
                "CONTENTLIB_PUBLIC_READ_FOR_AUTHORS",
                defaults.public_read_for_authors,
            ),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LibraryConfig::default();
        assert_eq!(config.max_asset_size_bytes, 20_971_520);
        assert_eq!(config.general_topic_reserve, 100);
        assert!(!config.public_read_for_authors);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("CONTENTLIB_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("CONTENTLIB_TEST_ENV_OR", 7usize), 7);
        std::env::set_var("CONTENTLIB_TEST_ENV_OR", " 12 ");
        assert_eq!(env_or("CONTENTLIB_TEST_ENV_OR", 7usize), 12);
        std::env::remove_var("CONTENTLIB_TEST_ENV_OR");
    }
}
