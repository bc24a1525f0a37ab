use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod engine;

/// Decimals of the reward token contract. Fixed for the deployment; rewards
/// are whole tokens and are scaled to the smallest unit before broadcast.
pub const TOKEN_DECIMALS: u32 = 18;

/// Outcome of a successful broadcast. The hash can be absent when the engine
/// reports success but the response carries it in none of the known places.
#[derive(Debug, Clone)]
pub struct ClaimReceipt {
    pub transaction_hash: Option<String>,
}

/// Abstraction over the external token-issuance service. The claim is made
/// from a single backend-controlled wallet so the receiving user never pays
/// gas.
///
/// A non-success outcome is ambiguous for `Timeout`/`Network`: the broadcast
/// may still have landed on-chain. Callers must not retry blindly; the
/// orchestrator surfaces these errors verbatim for a human decision.
#[async_trait]
pub trait ClaimGateway: Send + Sync {
    async fn claim(&self, receiver: &str, quantity: i64) -> ClaimResult<ClaimReceipt>;
}

/// Scales a whole-token quantity to the contract's smallest unit as a decimal
/// string. i64::MAX * 10^18 fits comfortably in u128.
pub fn to_smallest_unit(quantity: i64) -> String {
    (quantity.max(0) as u128 * 10u128.pow(TOKEN_DECIMALS)).to_string()
}

pub type ClaimResult<T> = core::result::Result<T, ClaimErr>;

#[derive(Debug, Error)]
pub enum ClaimErr {
    /// Deployment is missing engine credentials; fatal until the operator
    /// fixes the environment.
    #[error("claim gateway is not configured: missing {0}")]
    Unconfigured(&'static str),

    /// The engine answered with a non-2xx status. The full payload is kept
    /// for diagnostics and forwarded to the admin caller.
    #[error("engine rejected the claim ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        body: Value,
    },

    /// The request timed out; the underlying transaction may still land.
    #[error("claim request timed out; on-chain outcome unknown")]
    Timeout,

    /// Transport-level failure before or after broadcast; outcome unknown.
    #[error("network error during claim: {0}")]
    Network(reqwest::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_smallest_unit_scaling() {
        assert_eq!(to_smallest_unit(0), "0");
        assert_eq!(to_smallest_unit(1), "1000000000000000000");
        assert_eq!(to_smallest_unit(10), "10000000000000000000");
        assert_eq!(to_smallest_unit(-3), "0");
    }
}
