use async_trait::async_trait;
use x402_types::proto::PaymentRequirements;

use crate::client::X402Client;
use crate::client::builder::amount_with_fee;

/// A filtering or reordering step in requirement selection.
///
/// Policies run after requirements without a mechanism have been dropped and before the first
/// survivor is picked. An empty result makes selection fail with `NoSupportedRequirements`.
#[async_trait]
pub trait PaymentPolicy: Send + Sync {
    async fn apply(
        &self,
        requirements: Vec<PaymentRequirements>,
        client: &X402Client,
    ) -> Vec<PaymentRequirements>;
}

/// Drops requirements the buyer cannot afford.
///
/// The buyer needs `amount` plus `extra.fee.feeAmount`. The balance check is best effort: a
/// requirement is kept as-is when its mechanism cannot report a balance, or the query fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SufficientBalance;

#[async_trait]
impl PaymentPolicy for SufficientBalance {
    async fn apply(
        &self,
        requirements: Vec<PaymentRequirements>,
        client: &X402Client,
    ) -> Vec<PaymentRequirements> {
        let mut affordable = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            let Some(mechanism) = client.mechanism_for(&requirement.network) else {
                affordable.push(requirement);
                continue;
            };
            let balance = match mechanism.balance_of(&requirement).await {
                Ok(Some(balance)) => balance,
                Ok(None) => {
                    affordable.push(requirement);
                    continue;
                }
                Err(e) => {
                    tracing::debug!(
                        network = %requirement.network,
                        error = %e,
                        "Balance unavailable, keeping requirement"
                    );
                    affordable.push(requirement);
                    continue;
                }
            };
            let Ok(needed) = amount_with_fee(&requirement) else {
                affordable.push(requirement);
                continue;
            };
            if balance >= needed {
                tracing::debug!(
                    network = %requirement.network,
                    asset = %requirement.asset,
                    %balance,
                    %needed,
                    "Sufficient balance"
                );
                affordable.push(requirement);
            } else {
                tracing::info!(
                    network = %requirement.network,
                    asset = %requirement.asset,
                    %balance,
                    %needed,
                    "Insufficient balance, skipping requirement"
                );
            }
        }
        if affordable.is_empty() {
            tracing::warn!("All payment requirements filtered out: insufficient balance");
        }
        affordable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::X402Error;
    use crate::scheme::ClientMechanism;
    use crate::test_support::requirements;
    use alloy_primitives::U256;
    use x402_types::proto::{FeeInfo, PaymentPayload, RequirementsExtra};

    struct FixedBalance(Option<u64>);

    #[async_trait]
    impl ClientMechanism for FixedBalance {
        fn scheme(&self) -> &str {
            "upto"
        }

        async fn create_payment_payload(
            &self,
            _requirements: &PaymentRequirements,
            _resource: &str,
            _extensions: Option<&serde_json::Map<String, serde_json::Value>>,
        ) -> Result<PaymentPayload, X402Error> {
            Err(X402Error::MissingPaymentContext)
        }

        async fn balance_of(
            &self,
            _requirements: &PaymentRequirements,
        ) -> Result<Option<U256>, X402Error> {
            Ok(self.0.map(U256::from))
        }
    }

    fn on(network: &str, amount: &str) -> PaymentRequirements {
        let mut requirements = requirements();
        requirements.network = network.parse().unwrap();
        requirements.amount = amount.into();
        requirements
    }

    #[tokio::test]
    async fn test_unaffordable_requirements_are_dropped() {
        let client = X402Client::new()
            .register("tron:*".parse().unwrap(), FixedBalance(Some(1_000)))
            .register_policy(SufficientBalance);
        let accepts = vec![on("tron:nile", "5000"), on("tron:shasta", "1000")];
        let selected = client
            .select_payment_requirements(&accepts, None)
            .await
            .unwrap();
        assert_eq!(selected.network.to_string(), "tron:shasta");
    }

    #[tokio::test]
    async fn test_fee_counts_towards_needed_balance() {
        let client =
            X402Client::new().register("tron:*".parse().unwrap(), FixedBalance(Some(1_000)));
        let mut with_fee = on("tron:nile", "1000");
        with_fee.extra = Some(RequirementsExtra {
            fee: Some(FeeInfo {
                fee_to: "TFee".into(),
                fee_amount: "1".into(),
            }),
            ..Default::default()
        });
        let kept = SufficientBalance
            .apply(vec![with_fee, on("tron:nile", "1000")], &client)
            .await;
        assert_eq!(kept.len(), 1);
        assert!(kept[0].extra.is_none());
    }

    #[tokio::test]
    async fn test_unknown_balance_keeps_requirement() {
        let client = X402Client::new()
            .register("tron:*".parse().unwrap(), FixedBalance(None))
            .register_policy(SufficientBalance);
        let selected = client
            .select_payment_requirements(&[on("tron:nile", "5000")], None)
            .await
            .unwrap();
        assert_eq!(selected.amount, "5000");
    }

    #[tokio::test]
    async fn test_everything_unaffordable() {
        let client = X402Client::new()
            .register("tron:*".parse().unwrap(), FixedBalance(Some(0)))
            .register_policy(SufficientBalance);
        let err = client
            .select_payment_requirements(&[on("tron:nile", "1")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, X402Error::NoSupportedRequirements));
    }
}
