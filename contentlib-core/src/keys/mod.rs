//! Opaque keys for libraries and the content they own.
//!
//! Every key has one canonical text form. Parsing is total: malformed input
//! yields a [`KeyError`], never a panic. Equality and hashing are by content,
//! so keys compare equal across processes and storage round-trips.
//!
//! | Key | Text form |
//! |-----|-----------|
//! | [`LibraryKey`] | `lib:{org}:{slug}` |
//! | [`UsageKey`] | `lb:{org}:{slug}:{block_type}:{local_id}` |
//! | [`ContainerKey`] | `lct:{org}:{slug}:{container_type}:{local_id}` |
//! | [`CollectionKey`] | `lib-collection:{org}:{slug}:{collection_id}` |
//! | [`CourseKey`] | `course-v1:{org}+{course}+{run}` |
//! | [`CourseUsageKey`] | `block-v1:{org}+{course}+{run}+type@{type}+block@{id}` |

mod course;
mod library;

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use course::{CourseKey, CourseUsageKey};
pub use library::{CollectionKey, ContainerKey, ContainerType, LibraryKey, UsageKey};

static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_.\-]+$").expect("segment pattern is valid"));
static LOCAL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_.~\-]+$").expect("local id pattern is valid"));

/// A key failed to parse or a key segment failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} key '{input}': {reason}")]
pub struct KeyError {
    /// Which key family was being parsed
    pub kind: &'static str,
    /// The offending input
    pub input: String,
    /// Human readable reason
    pub reason: String,
}

impl KeyError {
    pub(crate) fn new(
        kind: &'static str,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            input: input.into(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn check_segment(
    kind: &'static str,
    input: &str,
    name: &str,
    segment: &str,
) -> Result<(), KeyError> {
    if SEGMENT_RE.is_match(segment) {
        Ok(())
    } else {
        Err(KeyError::new(
            kind,
            input,
            format!(
                "{} '{}' must be non-empty and contain only letters, digits, '-', '_' or '.'",
                name, segment
            ),
        ))
    }
}

pub(crate) fn check_local_id(
    kind: &'static str,
    input: &str,
    segment: &str,
) -> Result<(), KeyError> {
    if LOCAL_ID_RE.is_match(segment) {
        Ok(())
    } else {
        Err(KeyError::new(
            kind,
            input,
            format!("local id '{}' contains invalid characters", segment),
        ))
    }
}

/// The closed set of keys that address authored content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpaqueKey {
    Library(LibraryKey),
    Component(UsageKey),
    Container(ContainerKey),
}

impl OpaqueKey {
    /// Parse any of the three content key shapes, dispatching on the prefix.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let prefix = text.split(':').next().unwrap_or_default();
        match prefix {
            library::LIBRARY_PREFIX => LibraryKey::from_str(text).map(OpaqueKey::Library),
            library::USAGE_PREFIX => UsageKey::from_str(text).map(OpaqueKey::Component),
            library::CONTAINER_PREFIX => ContainerKey::from_str(text).map(OpaqueKey::Container),
            _ => Err(KeyError::new("opaque", text, "unknown key prefix")),
        }
    }

    /// Build the key of a child entity of a library. Container type names
    /// (including the legacy `vertical`/`sequential`/`chapter` names) produce
    /// container keys, any other type name produces a component usage key.
    pub fn derive_child(
        parent: &LibraryKey,
        type_name: &str,
        local_id: &str,
    ) -> Result<Self, KeyError> {
        match ContainerType::from_name(type_name) {
            Some(container_type) => parent
                .container_key(container_type, local_id)
                .map(OpaqueKey::Container),
            None => parent.usage_key(type_name, local_id).map(OpaqueKey::Component),
        }
    }

    pub fn library_key(&self) -> &LibraryKey {
        match self {
            OpaqueKey::Library(key) => key,
            OpaqueKey::Component(key) => key.library_key(),
            OpaqueKey::Container(key) => key.library_key(),
        }
    }
}

impl fmt::Display for OpaqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueKey::Library(key) => key.fmt(f),
            OpaqueKey::Component(key) => key.fmt(f),
            OpaqueKey::Container(key) => key.fmt(f),
        }
    }
}

impl FromStr for OpaqueKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpaqueKey::parse(s)
    }
}

impl From<UsageKey> for OpaqueKey {
    fn from(key: UsageKey) -> Self {
        OpaqueKey::Component(key)
    }
}

impl From<ContainerKey> for OpaqueKey {
    fn from(key: ContainerKey) -> Self {
        OpaqueKey::Container(key)
    }
}

impl From<LibraryKey> for OpaqueKey {
    fn from(key: LibraryKey) -> Self {
        OpaqueKey::Library(key)
    }
}

/// Serialize keys as their canonical string and parse them back on the way in.
macro_rules! impl_key_serde {
    ($($ty:ty),* $(,)?) => {
        $(
            impl serde::Serialize for $ty {
                fn serialize<S: serde::Serializer>(
                    &self,
                    serializer: S,
                ) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }

            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D: serde::Deserializer<'de>>(
                    deserializer: D,
                ) -> Result<Self, D::Error> {
                    let text = String::deserialize(deserializer)?;
                    text.parse().map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

impl_key_serde!(
    OpaqueKey,
    LibraryKey,
    UsageKey,
    ContainerKey,
    CollectionKey,
    ContainerType,
    CourseKey,
    CourseUsageKey,
);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_dispatches_on_prefix() {
        let lib = OpaqueKey::parse("lib:Axim:Demo").unwrap();
        assert!(matches!(lib, OpaqueKey::Library(_)));

        let block = OpaqueKey::parse("lb:Axim:Demo:problem:q1").unwrap();
        assert!(matches!(block, OpaqueKey::Component(_)));

        let unit = OpaqueKey::parse("lct:Axim:Demo:unit:u1").unwrap();
        assert!(matches!(unit, OpaqueKey::Container(_)));
        assert_eq!(unit.library_key().to_string(), "lib:Axim:Demo");
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        let err = OpaqueKey::parse("block-v1:Axim+C+R+type@problem+block@q1").unwrap_err();
        assert_eq!(err.kind, "opaque");
        assert!(OpaqueKey::parse("").is_err());
    }

    #[test]
    fn test_derive_child() {
        let lib = LibraryKey::new("Axim", "Demo").unwrap();

        let component = OpaqueKey::derive_child(&lib, "problem", "q1").unwrap();
        assert_eq!(component.to_string(), "lb:Axim:Demo:problem:q1");

        let container = OpaqueKey::derive_child(&lib, "sequential", "s1").unwrap();
        assert_eq!(container.to_string(), "lct:Axim:Demo:subsection:s1");

        assert!(OpaqueKey::derive_child(&lib, "problem", "bad id").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let key = OpaqueKey::parse("lb:Axim:Demo:html:intro").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"lb:Axim:Demo:html:intro\"");
        let back: OpaqueKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);

        let bad: Result<OpaqueKey, _> = serde_json::from_str("\"lb:Axim\"");
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn prop_library_key_text_form_is_stable(
            org in "[A-Za-z0-9_.-]{1,12}",
            slug in "[A-Za-z0-9_.-]{1,24}",
        ) {
            let key = LibraryKey::new(&org, &slug).unwrap();
            let text = key.to_string();
            let parsed: LibraryKey = text.parse().unwrap();
            prop_assert_eq!(&parsed, &key);
            prop_assert_eq!(parsed.to_string(), text);
        }

        #[test]
        fn prop_usage_key_round_trips(
            block_type in "[a-z][a-z0-9_-]{0,10}",
            local_id in "[A-Za-z0-9_.~-]{1,16}",
        ) {
            let lib = LibraryKey::new("Axim", "Demo").unwrap();
            let key = lib.usage_key(&block_type, &local_id).unwrap();
            let parsed = OpaqueKey::parse(&key.to_string()).unwrap();
            prop_assert_eq!(parsed, OpaqueKey::Component(key));
        }
    }
}
