use url::Url;
use x402_types::chain::ChainId;
use x402_types::networks::TRON_NAMESPACE;

/// Public TronGrid endpoints of the known TRON networks.
pub static TRON_GRID_HOSTS: &[(&str, &str)] = &[
    ("mainnet", "https://api.trongrid.io"),
    ("shasta", "https://api.shasta.trongrid.io"),
    ("nile", "https://nile.trongrid.io"),
];

/// The public TronGrid endpoint for `network`, if it is a known TRON network.
pub fn default_grid_url(network: &ChainId) -> Option<Url> {
    if network.namespace != TRON_NAMESPACE {
        return None;
    }
    TRON_GRID_HOSTS
        .iter()
        .find(|(reference, _)| *reference == network.reference)
        .and_then(|(_, host)| Url::parse(host).ok())
}
