//! CAIP-2 style chain identifiers.
//!
//! A chain id is `namespace:reference`:
//!
//! - **Namespace**: the chain family (`eip155` for EVM, `tron` for TRON)
//! - **Reference**: the network within that family (`8453`, `nile`, `mainnet`)
//!
//! ```
//! use x402_types::chain::ChainId;
//!
//! let nile: ChainId = "tron:nile".parse().unwrap();
//! assert_eq!(nile.namespace, "tron");
//! assert_eq!(nile.reference, "nile");
//! assert_eq!(nile.to_string(), "tron:nile");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A blockchain network identifier in `namespace:reference` form.
///
/// Serializes to and from a colon-separated string: `"tron:nile"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    /// The chain family (e.g., `eip155`, `tron`).
    pub namespace: String,
    /// The network within the family (e.g., `8453`, `nile`).
    pub reference: String,
}

impl ChainId {
    /// Creates a new chain id from namespace and reference components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.to_string()
    }
}

/// Error returned when parsing an invalid chain id or chain id pattern.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain id format {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(ChainId::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.into())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ChainId::from_str(&s).map_err(de::Error::custom)
    }
}

/// A pattern for matching chain ids.
///
/// - **Wildcard**: any network of a family, `tron:*`
/// - **Exact**: one network, `tron:nile`
/// - **Set**: any of the listed networks, `eip155:{1,8453,137}`
///
/// Patterns also carry a routing [priority](ChainIdPattern::priority): a pattern that names
/// networks explicitly always outranks a wildcard, regardless of registration order.
///
/// ```
/// use x402_types::chain::{ChainId, ChainIdPattern};
///
/// let any_tron: ChainIdPattern = "tron:*".parse().unwrap();
/// assert!(any_tron.matches(&ChainId::new("tron", "nile")));
/// assert!(!any_tron.matches(&ChainId::new("eip155", "1")));
///
/// let nile = ChainIdPattern::exact("tron", "nile");
/// assert!(nile.priority() > any_tron.priority());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIdPattern {
    /// Matches any chain within the specified namespace.
    Wildcard {
        namespace: String,
    },
    /// Matches exactly one chain.
    Exact {
        namespace: String,
        reference: String,
    },
    /// Matches any chain from a set of references within a namespace.
    Set {
        namespace: String,
        references: HashSet<String>,
    },
}

impl ChainIdPattern {
    /// Priority of patterns that name networks explicitly.
    pub const EXACT_PRIORITY: u8 = 10;
    /// Priority of `namespace:*` patterns.
    pub const WILDCARD_PRIORITY: u8 = 1;

    pub fn wildcard<S: Into<String>>(namespace: S) -> Self {
        Self::Wildcard {
            namespace: namespace.into(),
        }
    }

    pub fn exact<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self::Exact {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    pub fn set<N: Into<String>>(namespace: N, references: HashSet<String>) -> Self {
        Self::Set {
            namespace: namespace.into(),
            references,
        }
    }

    /// Check if a `ChainId` matches this pattern.
    ///
    /// - `Wildcard` matches any chain with the same namespace
    /// - `Exact` matches only if both namespace and reference are equal
    /// - `Set` matches if the namespace is equal and the reference is in the set
    pub fn matches(&self, chain_id: &ChainId) -> bool {
        match self {
            ChainIdPattern::Wildcard { namespace } => chain_id.namespace == *namespace,
            ChainIdPattern::Exact {
                namespace,
                reference,
            } => chain_id.namespace == *namespace && chain_id.reference == *reference,
            ChainIdPattern::Set {
                namespace,
                references,
            } => chain_id.namespace == *namespace && references.contains(&chain_id.reference),
        }
    }

    /// Routing priority derived purely from the pattern shape.
    pub fn priority(&self) -> u8 {
        match self {
            ChainIdPattern::Wildcard { .. } => Self::WILDCARD_PRIORITY,
            ChainIdPattern::Exact { .. } | ChainIdPattern::Set { .. } => Self::EXACT_PRIORITY,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            ChainIdPattern::Wildcard { namespace } => namespace,
            ChainIdPattern::Exact { namespace, .. } => namespace,
            ChainIdPattern::Set { namespace, .. } => namespace,
        }
    }
}

impl fmt::Display for ChainIdPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainIdPattern::Wildcard { namespace } => write!(f, "{}:*", namespace),
            ChainIdPattern::Exact {
                namespace,
                reference,
            } => write!(f, "{}:{}", namespace, reference),
            ChainIdPattern::Set {
                namespace,
                references,
            } => {
                let mut refs: Vec<&str> = references.iter().map(|s| s.as_ref()).collect();
                refs.sort_unstable();
                write!(f, "{}:{{{}}}", namespace, refs.join(","))
            }
        }
    }
}

impl FromStr for ChainIdPattern {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, rest) = s.split_once(':').ok_or(ChainIdFormatError(s.into()))?;

        if namespace.is_empty() {
            return Err(ChainIdFormatError(s.into()));
        }

        // Wildcard: tron:*
        if rest == "*" {
            return Ok(ChainIdPattern::wildcard(namespace));
        }

        // Set: eip155:{1,2,3}
        if let Some(inner) = rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            let mut references = HashSet::new();
            for item in inner.split(',') {
                let item = item.trim();
                if item.is_empty() {
                    return Err(ChainIdFormatError(s.into()));
                }
                references.insert(item.into());
            }
            return Ok(ChainIdPattern::set(namespace, references));
        }

        // Exact: tron:nile
        if rest.is_empty() {
            return Err(ChainIdFormatError(s.into()));
        }

        Ok(ChainIdPattern::exact(namespace, rest))
    }
}

impl Serialize for ChainIdPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainIdPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ChainIdPattern::from_str(&s).map_err(de::Error::custom)
    }
}

impl From<ChainId> for ChainIdPattern {
    fn from(chain_id: ChainId) -> Self {
        ChainIdPattern::exact(chain_id.namespace, chain_id.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_serialize_tron() {
        let chain_id = ChainId::new("tron", "nile");
        let serialized = serde_json::to_string(&chain_id).unwrap();
        assert_eq!(serialized, "\"tron:nile\"");
    }

    #[test]
    fn test_chain_id_deserialize_eip155() {
        let chain_id: ChainId = serde_json::from_str("\"eip155:8453\"").unwrap();
        assert_eq!(chain_id.namespace, "eip155");
        assert_eq!(chain_id.reference, "8453");
    }

    #[test]
    fn test_chain_id_deserialize_invalid_format() {
        assert!(serde_json::from_str::<ChainId>("\"invalid\"").is_err());
        assert!(serde_json::from_str::<ChainId>("\":nile\"").is_err());
        assert!(serde_json::from_str::<ChainId>("\"tron:\"").is_err());
    }

    #[test]
    fn test_chain_id_deserialize_unknown_namespace() {
        let result: Result<ChainId, _> = serde_json::from_str("\"unknown:1\"");
        assert!(result.is_ok());
    }

    #[test]
    fn test_pattern_wildcard_matches() {
        let pattern = ChainIdPattern::wildcard("tron");
        assert!(pattern.matches(&ChainId::new("tron", "mainnet")));
        assert!(pattern.matches(&ChainId::new("tron", "nile")));
        assert!(!pattern.matches(&ChainId::new("eip155", "1")));
    }

    #[test]
    fn test_pattern_exact_matches() {
        let pattern = ChainIdPattern::exact("tron", "nile");
        assert!(pattern.matches(&ChainId::new("tron", "nile")));
        assert!(!pattern.matches(&ChainId::new("tron", "shasta")));
        assert!(!pattern.matches(&ChainId::new("eip155", "nile")));
    }

    #[test]
    fn test_pattern_set_matches() {
        let pattern: ChainIdPattern = "eip155:{1, 8453,137}".parse().unwrap();
        assert!(pattern.matches(&ChainId::new("eip155", "1")));
        assert!(pattern.matches(&ChainId::new("eip155", "8453")));
        assert!(!pattern.matches(&ChainId::new("eip155", "42")));
        assert!(!pattern.matches(&ChainId::new("tron", "1")));
    }

    #[test]
    fn test_pattern_parse_rejects_malformed() {
        assert!("tron".parse::<ChainIdPattern>().is_err());
        assert!(":*".parse::<ChainIdPattern>().is_err());
        assert!("tron:".parse::<ChainIdPattern>().is_err());
        assert!("eip155:{1,,2}".parse::<ChainIdPattern>().is_err());
    }

    #[test]
    fn test_pattern_priority() {
        let wildcard: ChainIdPattern = "tron:*".parse().unwrap();
        let exact: ChainIdPattern = "tron:nile".parse().unwrap();
        let set: ChainIdPattern = "tron:{nile,shasta}".parse().unwrap();
        assert_eq!(wildcard.priority(), 1);
        assert_eq!(exact.priority(), 10);
        assert_eq!(set.priority(), 10);
    }

    #[test]
    fn test_pattern_display_roundtrip() {
        for raw in ["tron:*", "tron:nile", "eip155:{1,8453}"] {
            let pattern: ChainIdPattern = raw.parse().unwrap();
            assert_eq!(pattern.to_string(), raw);
        }
    }
}
