use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::instrument;

use crate::claim::{ClaimErr, ClaimGateway, ClaimReceipt, ClaimResult, to_smallest_unit};
use crate::util::env::Config;

/// Sentinel address the claim ABI uses for the chain's native currency; the
/// claim is free so no ERC20 currency is involved.
const NATIVE_CURRENCY: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const CLAIM_METHOD: &str = "function claim(address receiver, uint256 quantity, address currency, uint256 pricePerToken, (bytes32[] proof, uint256 quantityLimitPerWallet, uint256 pricePerToken, address currency) allowlistProof, bytes data) payable";

/// Token claim gateway backed by the engine's contract-write HTTP API.
///
/// Construction fails with `Unconfigured` when any credential is missing so
/// a misconfigured deployment is distinguishable from an engine rejection.
#[derive(Debug, Clone)]
pub struct EngineGateway {
    client: reqwest::Client,
    url: String,
    secret_key: String,
    backend_wallet: String,
    contract_address: String,
    chain_id: String,
}

impl EngineGateway {
    pub fn new(config: &Config) -> ClaimResult<Self> {
        let url = config
            .engine_url
            .clone()
            .ok_or(ClaimErr::Unconfigured("ENGINE_URL"))?;
        let secret_key = config
            .engine_secret_key
            .clone()
            .ok_or(ClaimErr::Unconfigured("ENGINE_SECRET_KEY"))?;
        let backend_wallet = config
            .backend_wallet
            .clone()
            .ok_or(ClaimErr::Unconfigured("BACKEND_WALLET"))?;
        let contract_address = config
            .token_contract_address
            .clone()
            .ok_or(ClaimErr::Unconfigured("TOKEN_CONTRACT_ADDRESS"))?;
        let chain_id = config
            .chain_id
            .clone()
            .ok_or(ClaimErr::Unconfigured("CHAIN_ID"))?;

        let client = reqwest::Client::builder()
            .timeout(config.claim_timeout)
            .build()
            .map_err(ClaimErr::Network)?;

        Ok(Self {
            client,
            url,
            secret_key,
            backend_wallet,
            contract_address,
            chain_id,
        })
    }
}

#[async_trait]
impl ClaimGateway for EngineGateway {
    #[instrument(skip(self))]
    async fn claim(&self, receiver: &str, quantity: i64) -> ClaimResult<ClaimReceipt> {
        let body = claim_body(
            &self.chain_id,
            &self.backend_wallet,
            &self.contract_address,
            receiver,
            quantity,
        );

        let res = self
            .client
            .post(&self.url)
            .header("x-secret-key", &self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClaimErr::Timeout
                } else {
                    ClaimErr::Network(e)
                }
            })?;

        let status = res.status();
        let payload = res.json::<Value>().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(error_message)
                .unwrap_or_else(|| format!("engine returned {status}"));

            tracing::error!(code = %status, body = ?payload, "claim rejected by engine");
            return Err(ClaimErr::Rejected {
                status: status.as_u16(),
                message,
                body: payload,
            });
        }

        let transaction_hash = extract_transaction_hash(&payload);
        match &transaction_hash {
            Some(hash) => tracing::info!(hash, receiver, quantity, "claim broadcast"),
            // success without a recognizable hash is still success
            None => tracing::warn!(receiver, quantity, "claim succeeded, hash unknown"),
        }

        Ok(ClaimReceipt { transaction_hash })
    }
}

/// Stand-in gateway installed when the engine credentials are absent. Every
/// claim fails with the `Unconfigured` it was built from, so submissions and
/// rejections keep working while approvals report the deployment problem.
#[derive(Debug, Clone)]
pub struct UnconfiguredGateway {
    missing: &'static str,
}

impl UnconfiguredGateway {
    pub fn new(missing: &'static str) -> Self {
        Self { missing }
    }
}

#[async_trait]
impl ClaimGateway for UnconfiguredGateway {
    async fn claim(&self, _receiver: &str, _quantity: i64) -> ClaimResult<ClaimReceipt> {
        Err(ClaimErr::Unconfigured(self.missing))
    }
}

fn claim_body(
    chain_id: &str,
    backend_wallet: &str,
    contract_address: &str,
    receiver: &str,
    quantity: i64,
) -> Value {
    json!({
        "chainId": chain_id,
        "from": backend_wallet,
        "calls": [{
            "contractAddress": contract_address,
            "method": CLAIM_METHOD,
            "params": [
                receiver,
                to_smallest_unit(quantity),
                NATIVE_CURRENCY,
                "0",
                {
                    "proof": [],
                    "quantityLimitPerWallet": "0",
                    "pricePerToken": "0",
                    "currency": ZERO_ADDRESS,
                },
                "0x",
            ],
        }],
    })
}

fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::String(s) => Some(s.clone()),
        // some engine versions nest the reason one level down
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// The engine moves the transaction hash around between versions; probe every
/// known location. Absence of all of them is not a failure.
pub fn extract_transaction_hash(payload: &Value) -> Option<String> {
    let candidates = [
        &payload["transactionHash"],
        &payload["result"]["transactionHash"],
        &payload["receipt"]["transactionHash"],
        &payload["result"]["receipt"]["transactionHash"],
    ];

    candidates
        .into_iter()
        .find_map(|v| v.as_str().map(str::to_string))
}
