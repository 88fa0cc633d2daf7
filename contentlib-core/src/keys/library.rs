use std::fmt;
use std::str::FromStr;

use super::{check_local_id, check_segment, KeyError};

pub(crate) const LIBRARY_PREFIX: &str = "lib";
pub(crate) const USAGE_PREFIX: &str = "lb";
pub(crate) const CONTAINER_PREFIX: &str = "lct";
pub(crate) const COLLECTION_PREFIX: &str = "lib-collection";

/// Key of a content library: `(organization, slug)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryKey {
    org: String,
    slug: String,
}

impl LibraryKey {
    pub fn new(org: &str, slug: &str) -> Result<Self, KeyError> {
        let input = format!("{}:{}:{}", LIBRARY_PREFIX, org, slug);
        check_segment("library", &input, "org", org)?;
        check_segment("library", &input, "slug", slug)?;
        Ok(Self {
            org: org.to_string(),
            slug: slug.to_string(),
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn usage_key(&self, block_type: &str, local_id: &str) -> Result<UsageKey, KeyError> {
        let input =
            format!("{}:{}:{}:{}:{}", USAGE_PREFIX, self.org, self.slug, block_type, local_id);
        check_segment("usage", &input, "block type", block_type)?;
        check_local_id("usage", &input, local_id)?;
        Ok(UsageKey {
            library: self.clone(),
            block_type: block_type.to_string(),
            local_id: local_id.to_string(),
        })
    }

    pub fn container_key(
        &self,
        container_type: ContainerType,
        local_id: &str,
    ) -> Result<ContainerKey, KeyError> {
        let input = format!(
            "{}:{}:{}:{}:{}",
            CONTAINER_PREFIX,
            self.org,
            self.slug,
            container_type.as_str(),
            local_id
        );
        check_local_id("container", &input, local_id)?;
        Ok(ContainerKey {
            library: self.clone(),
            container_type,
            local_id: local_id.to_string(),
        })
    }

    pub fn collection_key(&self, collection_id: &str) -> Result<CollectionKey, KeyError> {
        let input = format!("{}:{}:{}:{}", COLLECTION_PREFIX, self.org, self.slug, collection_id);
        check_local_id("collection", &input, collection_id)?;
        Ok(CollectionKey {
            library: self.clone(),
            collection_id: collection_id.to_string(),
        })
    }
}

impl fmt::Display for LibraryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", LIBRARY_PREFIX, self.org, self.slug)
    }
}

impl FromStr for LibraryKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [LIBRARY_PREFIX, org, slug] => LibraryKey::new(org, slug).map_err(|e| KeyError {
                input: s.to_string(),
                ..e
            }),
            _ => Err(KeyError::new("library", s, "expected lib:{org}:{slug}")),
        }
    }
}

/// Key of a component inside a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageKey {
    library: LibraryKey,
    block_type: String,
    local_id: String,
}

impl UsageKey {
    pub fn library_key(&self) -> &LibraryKey {
        &self.library
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            USAGE_PREFIX, self.library.org, self.library.slug, self.block_type, self.local_id
        )
    }
}

impl FromStr for UsageKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [USAGE_PREFIX, org, slug, block_type, local_id] => LibraryKey::new(org, slug)
                .and_then(|lib| lib.usage_key(block_type, local_id))
                .map_err(|e| KeyError {
                    kind: "usage",
                    input: s.to_string(),
                    ..e
                }),
            _ => Err(KeyError::new(
                "usage",
                s,
                "expected lb:{org}:{slug}:{block_type}:{local_id}",
            )),
        }
    }
}

/// The three container ranks. Children of a container are always exactly one
/// rank lower: sections hold subsections, subsections hold units and units
/// hold components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerType {
    Unit,
    Subsection,
    Section,
}

impl ContainerType {
    pub const ALL: [ContainerType; 3] = [
        ContainerType::Unit,
        ContainerType::Subsection,
        ContainerType::Section,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Unit => "unit",
            ContainerType::Subsection => "subsection",
            ContainerType::Section => "section",
        }
    }

    /// The OLX tag used for this container in course exports.
    pub fn olx_tag(&self) -> &'static str {
        match self {
            ContainerType::Unit => "vertical",
            ContainerType::Subsection => "sequential",
            ContainerType::Section => "chapter",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            ContainerType::Unit => 1,
            ContainerType::Subsection => 2,
            ContainerType::Section => 3,
        }
    }

    /// Container type of the children, or `None` when children are components.
    pub fn child_type(&self) -> Option<ContainerType> {
        match self {
            ContainerType::Unit => None,
            ContainerType::Subsection => Some(ContainerType::Unit),
            ContainerType::Section => Some(ContainerType::Subsection),
        }
    }

    /// Accepts both the canonical names and the OLX tag names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unit" | "vertical" => Some(ContainerType::Unit),
            "subsection" | "sequential" => Some(ContainerType::Subsection),
            "section" | "chapter" => Some(ContainerType::Section),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContainerType::from_name(s)
            .ok_or_else(|| KeyError::new("container type", s, "unknown container type"))
    }
}

/// Key of a unit, subsection or section inside a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerKey {
    library: LibraryKey,
    container_type: ContainerType,
    local_id: String,
}

impl ContainerKey {
    pub fn library_key(&self) -> &LibraryKey {
        &self.library
    }

    pub fn container_type(&self) -> ContainerType {
        self.container_type
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            CONTAINER_PREFIX,
            self.library.org,
            self.library.slug,
            self.container_type.as_str(),
            self.local_id
        )
    }
}

impl FromStr for ContainerKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [CONTAINER_PREFIX, org, slug, container_type, local_id] => {
                let container_type = ContainerType::from_name(container_type).ok_or_else(|| {
                    KeyError::new(
                        "container",
                        s,
                        format!("unknown container type '{}'", container_type),
                    )
                })?;
                LibraryKey::new(org, slug)
                    .and_then(|lib| lib.container_key(container_type, local_id))
                    .map_err(|e| KeyError {
                        kind: "container",
                        input: s.to_string(),
                        ..e
                    })
            }
            _ => Err(KeyError::new(
                "container",
                s,
                "expected lct:{org}:{slug}:{container_type}:{local_id}",
            )),
        }
    }
}

/// Key of a collection inside a library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey {
    library: LibraryKey,
    collection_id: String,
}

impl CollectionKey {
    pub fn library_key(&self) -> &LibraryKey {
        &self.library
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            COLLECTION_PREFIX, self.library.org, self.library.slug, self.collection_id
        )
    }
}

impl FromStr for CollectionKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [COLLECTION_PREFIX, org, slug, collection_id] => LibraryKey::new(org, slug)
                .and_then(|lib| lib.collection_key(collection_id))
                .map_err(|e| KeyError {
                    kind: "collection",
                    input: s.to_string(),
                    ..e
                }),
            _ => Err(KeyError::new(
                "collection",
                s,
                "expected lib-collection:{org}:{slug}:{collection_id}",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_key_round_trip() {
        let key: LibraryKey = "lib:Axim:Demo".parse().unwrap();
        assert_eq!(key.org(), "Axim");
        assert_eq!(key.slug(), "Demo");
        assert_eq!(key.to_string(), "lib:Axim:Demo");
    }

    #[test]
    fn test_library_key_rejects_malformed_input() {
        for bad in ["lib:Axim", "lib::Demo", "lib:Axim:De mo", "lb:Axim:Demo", "lib:Axim:Demo:x"] {
            assert!(bad.parse::<LibraryKey>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_usage_key_parts() {
        let key: UsageKey = "lb:Axim:Demo:problem:q1".parse().unwrap();
        assert_eq!(key.library_key().to_string(), "lib:Axim:Demo");
        assert_eq!(key.block_type(), "problem");
        assert_eq!(key.local_id(), "q1");
        assert_eq!(key.to_string(), "lb:Axim:Demo:problem:q1");
    }

    #[test]
    fn test_container_key_canonicalizes_legacy_type() {
        let key: ContainerKey = "lct:Axim:Demo:vertical:u1".parse().unwrap();
        assert_eq!(key.container_type(), ContainerType::Unit);
        assert_eq!(key.to_string(), "lct:Axim:Demo:unit:u1");

        assert!("lct:Axim:Demo:problem:u1".parse::<ContainerKey>().is_err());
    }

    #[test]
    fn test_container_type_ranks() {
        assert_eq!(ContainerType::Section.child_type(), Some(ContainerType::Subsection));
        assert_eq!(ContainerType::Subsection.child_type(), Some(ContainerType::Unit));
        assert_eq!(ContainerType::Unit.child_type(), None);
        for container_type in ContainerType::ALL {
            if let Some(child) = container_type.child_type() {
                assert_eq!(child.rank() + 1, container_type.rank());
            }
        }
        assert_eq!(ContainerType::Section.olx_tag(), "chapter");
    }

    #[test]
    fn test_collection_key() {
        let lib = LibraryKey::new("Axim", "Demo").unwrap();
        let key = lib.collection_key("favorites").unwrap();
        assert_eq!(key.to_string(), "lib-collection:Axim:Demo:favorites");
        let parsed: CollectionKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_keys_hash_by_content() {
        use std::collections::HashSet;
        let a: UsageKey = "lb:Axim:Demo:html:a".parse().unwrap();
        let b = LibraryKey::new("Axim", "Demo").unwrap().usage_key("html", "a").unwrap();
        let set: HashSet<UsageKey> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
