//! Network registry: chain id and settlement contract per network.
//!
//! Every permit is signed under a typed-data domain that binds it to a numeric chain id and
//! to the settlement contract that will execute it. This module answers both lookups for a
//! network identifier.
//!
//! - Networks in the `eip155` namespace encode their numeric chain id in the identifier
//!   (`eip155:8453` has chain id `8453`); it is parsed, never looked up.
//! - Every other namespace needs a table entry. The registry is seeded with the TRON networks
//!   that have a deployed `PaymentPermit` contract, see [`KNOWN_NETWORKS`].
//!
//! Settlement contracts are stored in the chain's native address form; converting them into
//! canonical form is the job of the chain's address codec.
//!
//! ```
//! use x402_types::chain::ChainId;
//! use x402_types::networks::{NetworkError, NetworkRegistry};
//!
//! let registry = NetworkRegistry::with_defaults();
//! assert_eq!(registry.chain_id(&ChainId::new("tron", "nile")).unwrap(), 3448148188);
//! assert_eq!(registry.chain_id(&ChainId::new("eip155", "8453")).unwrap(), 8453);
//! assert!(matches!(
//!     registry.settlement_contract(&ChainId::new("eip155", "8453")),
//!     Err(NetworkError::MissingSettlementContract(_))
//! ));
//! ```

use std::collections::HashMap;

use crate::chain::ChainId;
use crate::config::NetworksConfig;

/// Namespace whose references are numeric chain ids.
pub const EIP155_NAMESPACE: &str = "eip155";

/// Namespace of TRON networks.
pub const TRON_NAMESPACE: &str = "tron";

/// A statically known network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownNetwork {
    pub namespace: &'static str,
    pub reference: &'static str,
    /// Numeric chain id used in the typed-data domain.
    pub chain_id: u64,
    /// `PaymentPermit` contract address in native form.
    pub settlement_contract: Option<&'static str>,
}

impl KnownNetwork {
    pub fn network(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// Networks with a deployed `PaymentPermit` contract.
pub static KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        namespace: TRON_NAMESPACE,
        reference: "mainnet",
        chain_id: 728126428,
        settlement_contract: Some("TT8rEWbCoNX7vpEUauxb7rWJsTgs8vDLAn"),
    },
    KnownNetwork {
        namespace: TRON_NAMESPACE,
        reference: "shasta",
        chain_id: 2494104990,
        settlement_contract: Some("TR2XninQ3jsvRRLGTifFyUHTBysffooUjt"),
    },
    KnownNetwork {
        namespace: TRON_NAMESPACE,
        reference: "nile",
        chain_id: 3448148188,
        settlement_contract: Some("TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH"),
    },
];

/// Registry entry for a single network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    pub chain_id: u64,
    pub settlement_contract: Option<String>,
}

impl From<&KnownNetwork> for NetworkEntry {
    fn from(value: &KnownNetwork) -> Self {
        Self {
            chain_id: value.chain_id,
            settlement_contract: value.settlement_contract.map(String::from),
        }
    }
}

/// Configuration errors raised by registry lookups.
///
/// These are fatal for the request that triggered them and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(ChainId),
    #[error("No settlement contract configured for network {0}")]
    MissingSettlementContract(ChainId),
}

/// Maps network identifiers to chain ids and settlement contracts.
///
/// Built once during setup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    entries: HashMap<ChainId, NetworkEntry>,
}

impl NetworkRegistry {
    /// An empty registry. `eip155` chain ids still resolve, nothing else does.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with [`KNOWN_NETWORKS`].
    pub fn with_defaults() -> Self {
        let entries = KNOWN_NETWORKS
            .iter()
            .map(|known| (known.network(), NetworkEntry::from(known)))
            .collect();
        Self { entries }
    }

    pub fn register(&mut self, network: ChainId, entry: NetworkEntry) {
        tracing::debug!(
            %network,
            chain_id = entry.chain_id,
            contract = ?entry.settlement_contract,
            "Registered network"
        );
        self.entries.insert(network, entry);
    }

    pub fn and_register(mut self, network: ChainId, entry: NetworkEntry) -> Self {
        self.register(network, entry);
        self
    }

    /// Applies configured overrides on top of the current entries.
    ///
    /// An override may add a settlement contract to an existing or `eip155` network, replace
    /// a contract, or introduce a new network. A new non-`eip155` network must state its
    /// chain id.
    pub fn with_overrides(mut self, config: &NetworksConfig) -> Result<Self, NetworkError> {
        for (network, overrides) in config.iter() {
            let chain_id = match overrides.chain_id {
                Some(chain_id) => chain_id,
                None => self.chain_id(network)?,
            };
            let settlement_contract = overrides
                .settlement_contract
                .as_ref()
                .map(|contract| contract.inner().clone())
                .or_else(|| {
                    self.entries
                        .get(network)
                        .and_then(|entry| entry.settlement_contract.clone())
                });
            self.register(
                network.clone(),
                NetworkEntry {
                    chain_id,
                    settlement_contract,
                },
            );
        }
        Ok(self)
    }

    /// Numeric chain id for the typed-data domain.
    pub fn chain_id(&self, network: &ChainId) -> Result<u64, NetworkError> {
        if network.namespace == EIP155_NAMESPACE {
            return network
                .reference
                .parse::<u64>()
                .map_err(|_| NetworkError::UnsupportedNetwork(network.clone()));
        }
        self.entries
            .get(network)
            .map(|entry| entry.chain_id)
            .ok_or_else(|| NetworkError::UnsupportedNetwork(network.clone()))
    }

    /// Settlement (`PaymentPermit`) contract address in native form.
    pub fn settlement_contract(&self, network: &ChainId) -> Result<&str, NetworkError> {
        match self.entries.get(network) {
            Some(entry) => entry
                .settlement_contract
                .as_deref()
                .ok_or_else(|| NetworkError::MissingSettlementContract(network.clone())),
            None if network.namespace == EIP155_NAMESPACE => {
                // Validates the reference before reporting the missing contract.
                self.chain_id(network)?;
                Err(NetworkError::MissingSettlementContract(network.clone()))
            }
            None => Err(NetworkError::UnsupportedNetwork(network.clone())),
        }
    }

    /// Networks with an explicit entry.
    pub fn networks(&self) -> impl Iterator<Item = &ChainId> {
        self.entries.keys()
    }
}
