use std::collections::HashMap;
use std::sync::Arc;
use x402_types::chain::{ChainId, ChainIdPattern};
use x402_types::proto::{
    ErrorReason, FeeQuoteResponse, PaymentPayload, PaymentRequirements, SettleResponse,
    SupportedPaymentKind, SupportedResponse, VerifyResponse, X402Version2,
};

use crate::error::FacilitatorError;
use crate::scheme::FacilitatorMechanism;

struct FacilitatorEntry {
    pattern: ChainIdPattern,
    priority: u8,
    mechanism: Arc<dyn FacilitatorMechanism>,
}

/// Routes facilitator requests to the mechanism registered for their scheme and network.
///
/// Exact network patterns take precedence over wildcards, the same rule the client registry
/// applies. A request nobody can serve gets an `unsupported_network` or `unsupported_scheme`
/// answer instead of an error.
#[derive(Default)]
pub struct FacilitatorRegistry {
    entries: Vec<FacilitatorEntry>,
}

impl std::fmt::Debug for FacilitatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| format!("{}@{}", entry.mechanism.scheme(), entry.pattern)),
            )
            .finish()
    }
}

/// Why a request could not be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unroutable {
    Network,
    Scheme,
}

impl From<Unroutable> for ErrorReason {
    fn from(value: Unroutable) -> Self {
        match value {
            Unroutable::Network => ErrorReason::UnsupportedNetwork,
            Unroutable::Scheme => ErrorReason::UnsupportedScheme,
        }
    }
}

impl FacilitatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: FacilitatorMechanism + 'static>(
        mut self,
        pattern: ChainIdPattern,
        mechanism: M,
    ) -> Self {
        self.register_mechanism(pattern, Arc::new(mechanism));
        self
    }

    pub fn register_mechanism(
        &mut self,
        pattern: ChainIdPattern,
        mechanism: Arc<dyn FacilitatorMechanism>,
    ) {
        let priority = pattern.priority();
        tracing::info!(
            %pattern,
            priority,
            scheme = mechanism.scheme(),
            "Registered facilitator mechanism"
        );
        self.entries.push(FacilitatorEntry {
            pattern,
            priority,
            mechanism,
        });
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    fn route(
        &self,
        scheme: &str,
        network: &ChainId,
    ) -> Result<&Arc<dyn FacilitatorMechanism>, Unroutable> {
        let mut on_network = self
            .entries
            .iter()
            .filter(|entry| entry.pattern.matches(network))
            .peekable();
        if on_network.peek().is_none() {
            return Err(Unroutable::Network);
        }
        on_network
            .find(|entry| entry.mechanism.scheme() == scheme)
            .map(|entry| &entry.mechanism)
            .ok_or(Unroutable::Scheme)
    }

    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorError> {
        match self.route(&requirements.scheme, &requirements.network) {
            Ok(mechanism) => mechanism.verify(payload, requirements).await,
            Err(unroutable) => {
                tracing::warn!(
                    scheme = %requirements.scheme,
                    network = %requirements.network,
                    "No mechanism to verify with"
                );
                Ok(VerifyResponse::invalid(unroutable.into()))
            }
        }
    }

    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorError> {
        match self.route(&requirements.scheme, &requirements.network) {
            Ok(mechanism) => mechanism.settle(payload, requirements).await,
            Err(unroutable) => {
                tracing::warn!(
                    scheme = %requirements.scheme,
                    network = %requirements.network,
                    "No mechanism to settle with"
                );
                Ok(SettleResponse::failure(
                    unroutable.into(),
                    requirements.network.clone(),
                ))
            }
        }
    }

    /// Fee quote from the responsible mechanism; `None` when no mechanism serves the request.
    pub async fn fee_quote(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<Option<FeeQuoteResponse>, FacilitatorError> {
        match self.route(&requirements.scheme, &requirements.network) {
            Ok(mechanism) => mechanism.fee_quote(requirements).await.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Fee quotes for every requirement some mechanism serves, in input order.
    pub async fn fee_quotes(
        &self,
        accepts: &[PaymentRequirements],
    ) -> Result<Vec<FeeQuoteResponse>, FacilitatorError> {
        let mut quotes = Vec::with_capacity(accepts.len());
        for requirements in accepts {
            if let Some(quote) = self.fee_quote(requirements).await? {
                quotes.push(quote);
            }
        }
        Ok(quotes)
    }

    /// Registered kinds and the signer addresses behind each network pattern.
    pub fn supported(&self) -> SupportedResponse {
        let mut kinds = Vec::with_capacity(self.entries.len());
        let mut signers: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &self.entries {
            let network = entry.pattern.to_string();
            kinds.push(SupportedPaymentKind {
                x402_version: X402Version2::VALUE,
                scheme: entry.mechanism.scheme().to_string(),
                network: network.clone(),
            });
            let addresses = signers.entry(network).or_default();
            let address = entry.mechanism.signer_address();
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        SupportedResponse { kinds, signers }
    }
}
