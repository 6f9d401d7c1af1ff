//! Client side: choosing what to pay and building the signed payload.
//!
//! [`X402Client`] holds the registered client mechanisms, each under a network pattern. Given
//! the requirements a resource server accepts, it picks one, finds the mechanism for its network
//! and lets the mechanism build the payload.
//!
//! ```ignore
//! let client = X402Client::new()
//!     .register("tron:*".parse()?, UptoClient::new(tron_signer.clone(), TronAddressCodec, networks.clone()))
//!     .register("eip155:8453".parse()?, UptoClient::new(evm_signer, Eip155AddressCodec, networks))
//!     .register_policy(SufficientBalance);
//!
//! let payload = client
//!     .handle_payment(&required.accepts, "https://api.example.com/data", Some(&required.extensions), None)
//!     .await?;
//! ```

mod builder;
mod policy;

pub use builder::*;
pub use policy::*;

use alloy_primitives::U256;
use std::sync::Arc;
use x402_types::chain::{ChainId, ChainIdPattern};
use x402_types::proto::{PaymentPayload, PaymentRequired, PaymentRequirements};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::X402Error;
use crate::permit::parse_amount;
use crate::scheme::ClientMechanism;

/// Optional narrowing applied before mechanism matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementsFilter {
    pub scheme: Option<String>,
    pub network: Option<ChainId>,
    /// Inclusive upper bound on `amount`.
    pub max_amount: Option<U256>,
}

impl RequirementsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme<S: Into<String>>(mut self, scheme: S) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn network(mut self, network: ChainId) -> Self {
        self.network = Some(network);
        self
    }

    pub fn max_amount(mut self, max_amount: U256) -> Self {
        self.max_amount = Some(max_amount);
        self
    }

    fn accepts(&self, requirements: &PaymentRequirements) -> bool {
        let scheme_ok = self
            .scheme
            .as_ref()
            .is_none_or(|scheme| &requirements.scheme == scheme);
        let network_ok = self
            .network
            .as_ref()
            .is_none_or(|network| &requirements.network == network);
        // An amount that does not parse cannot be shown to be within bounds.
        let amount_ok = self.max_amount.is_none_or(|max_amount| {
            parse_amount(&requirements.amount).is_ok_and(|amount| amount <= max_amount)
        });
        scheme_ok && network_ok && amount_ok
    }
}

/// Custom selection over the raw accepted requirements, replacing the default policy.
pub trait PaymentSelector: Send + Sync {
    fn select(&self, accepts: &[PaymentRequirements]) -> Option<PaymentRequirements>;
}

impl<F> PaymentSelector for F
where
    F: Fn(&[PaymentRequirements]) -> Option<PaymentRequirements> + Send + Sync,
{
    fn select(&self, accepts: &[PaymentRequirements]) -> Option<PaymentRequirements> {
        self(accepts)
    }
}

struct MechanismEntry {
    pattern: ChainIdPattern,
    priority: u8,
    mechanism: Arc<dyn ClientMechanism>,
}

/// Mechanism registry and payment flow entry point.
///
/// Register mechanisms and policies during setup; afterwards the client is only read and can be
/// shared freely.
#[derive(Default)]
pub struct X402Client {
    mechanisms: Vec<MechanismEntry>,
    policies: Vec<Arc<dyn PaymentPolicy>>,
}

impl std::fmt::Debug for X402Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Client")
            .field(
                "mechanisms",
                &self
                    .mechanisms
                    .iter()
                    .map(|entry| (entry.pattern.to_string(), entry.priority))
                    .collect::<Vec<_>>(),
            )
            .field("policies", &self.policies.len())
            .finish()
    }
}

impl X402Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `mechanism` for networks matching `pattern`.
    pub fn register<M: ClientMechanism + 'static>(
        mut self,
        pattern: ChainIdPattern,
        mechanism: M,
    ) -> Self {
        self.register_mechanism(pattern, Arc::new(mechanism));
        self
    }

    /// Inserts a mechanism and keeps the list ordered by priority.
    ///
    /// The sort is stable, so among equal priorities the earlier registration wins.
    pub fn register_mechanism(
        &mut self,
        pattern: ChainIdPattern,
        mechanism: Arc<dyn ClientMechanism>,
    ) {
        let priority = pattern.priority();
        tracing::info!(
            %pattern,
            priority,
            scheme = mechanism.scheme(),
            "Registered client mechanism"
        );
        self.mechanisms.push(MechanismEntry {
            pattern,
            priority,
            mechanism,
        });
        self.mechanisms.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Adds a policy. Policies run in registration order.
    pub fn register_policy<P: PaymentPolicy + 'static>(mut self, policy: P) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// The highest-priority mechanism whose pattern matches `network`.
    pub fn mechanism_for(&self, network: &ChainId) -> Option<&Arc<dyn ClientMechanism>> {
        self.mechanisms
            .iter()
            .find(|entry| entry.pattern.matches(network))
            .map(|entry| &entry.mechanism)
    }

    /// Default selection.
    ///
    /// Applies `filter`, drops requirements no mechanism can serve, runs the policies and
    /// returns the first survivor. `accepts` is taken to be in the server's order of preference.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    pub async fn select_payment_requirements(
        &self,
        accepts: &[PaymentRequirements],
        filter: Option<&RequirementsFilter>,
    ) -> Result<PaymentRequirements, X402Error> {
        let mut candidates = accepts
            .iter()
            .filter(|requirements| filter.is_none_or(|filter| filter.accepts(requirements)))
            .filter(|requirements| self.mechanism_for(&requirements.network).is_some())
            .cloned()
            .collect::<Vec<_>>();
        tracing::debug!(
            offered = accepts.len(),
            supported = candidates.len(),
            "Filtered payment requirements"
        );
        for policy in &self.policies {
            candidates = policy.apply(candidates, self).await;
        }
        let selected = candidates
            .into_iter()
            .next()
            .ok_or(X402Error::NoSupportedRequirements)?;
        tracing::info!(
            network = %selected.network,
            scheme = %selected.scheme,
            amount = %selected.amount,
            "Selected payment requirements"
        );
        Ok(selected)
    }

    /// Builds a payload with the mechanism registered for `requirements.network`.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(network = %requirements.network))
    )]
    pub async fn create_payment_payload(
        &self,
        requirements: &PaymentRequirements,
        resource: &str,
        extensions: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<PaymentPayload, X402Error> {
        let mechanism = self
            .mechanism_for(&requirements.network)
            .ok_or_else(|| X402Error::NoMechanismRegistered(requirements.network.clone()))?;
        let payload = mechanism
            .create_payment_payload(requirements, resource, extensions)
            .await?;
        tracing::info!(network = %requirements.network, resource, "Created payment payload");
        Ok(payload)
    }

    /// Selection followed by payload creation.
    ///
    /// A `selector` sees the raw `accepts` and replaces the default selection entirely.
    pub async fn handle_payment(
        &self,
        accepts: &[PaymentRequirements],
        resource: &str,
        extensions: Option<&serde_json::Map<String, serde_json::Value>>,
        selector: Option<&dyn PaymentSelector>,
    ) -> Result<PaymentPayload, X402Error> {
        let requirements = match selector {
            Some(selector) => selector
                .select(accepts)
                .ok_or(X402Error::NoSupportedRequirements)?,
            None => self.select_payment_requirements(accepts, None).await?,
        };
        self.create_payment_payload(&requirements, resource, extensions)
            .await
    }

    /// [`handle_payment`](Self::handle_payment) driven by a 402 response body.
    ///
    /// The resource URL and extensions are taken from the body; `fallback_resource` is used when
    /// the body does not name its resource.
    pub async fn handle_payment_required(
        &self,
        payment_required: &PaymentRequired,
        fallback_resource: &str,
        selector: Option<&dyn PaymentSelector>,
    ) -> Result<PaymentPayload, X402Error> {
        let resource = payment_required
            .resource
            .as_ref()
            .map(|resource| resource.url.as_str())
            .unwrap_or(fallback_resource);
        self.handle_payment(
            &payment_required.accepts,
            resource,
            Some(&payment_required.extensions),
            selector,
        )
        .await
    }
}
