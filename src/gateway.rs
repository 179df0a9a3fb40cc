//! 読み取り専用のコントラクト呼び出し

use alloy_primitives::{hex, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

sol! {
    function tokenURI(uint256 tokenId) external view returns (string);
    function hasIdentityOpenedABox(uint256 identityId) external view returns (bool);
    function vaultBoxOpenedByIdentity(uint256 vaultId) external view returns (uint256);
}

/// 呼び出し対象の関数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractFunction {
    TokenUri,
    HasIdentityOpenedABox,
    VaultBoxOpenedByIdentity,
}

impl ContractFunction {
    pub fn name(self) -> &'static str {
        match self {
            ContractFunction::TokenUri => "tokenURI",
            ContractFunction::HasIdentityOpenedABox => "hasIdentityOpenedABox",
            ContractFunction::VaultBoxOpenedByIdentity => "vaultBoxOpenedByIdentity",
        }
    }
}

/// 関数の戻り値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallValue {
    Text(String),
    Flag(bool),
    Uint(u64),
}

#[derive(Debug, Error)]
pub enum CallError {
    /// revert など、トークンが存在しない場合
    #[error("{function} reverted: {message}")]
    NotFound {
        function: &'static str,
        message: String,
    },

    #[error("{function} returned unexpected data: {reason}")]
    InvalidReturn {
        function: &'static str,
        reason: String,
    },

    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CallValue {
    pub fn into_text(self, function: ContractFunction) -> Result<String, CallError> {
        match self {
            CallValue::Text(s) => Ok(s),
            other => Err(unexpected(function, &other)),
        }
    }

    pub fn into_flag(self, function: ContractFunction) -> Result<bool, CallError> {
        match self {
            CallValue::Flag(b) => Ok(b),
            other => Err(unexpected(function, &other)),
        }
    }

    pub fn into_uint(self, function: ContractFunction) -> Result<u64, CallError> {
        match self {
            CallValue::Uint(n) => Ok(n),
            other => Err(unexpected(function, &other)),
        }
    }
}

fn unexpected(function: ContractFunction, value: &CallValue) -> CallError {
    CallError::InvalidReturn {
        function: function.name(),
        reason: format!("unexpected value kind {:?}", value),
    }
}

/// チェーンへの読み取り呼び出し口。ワーカー間で共有される
pub trait ContractGateway: Sync {
    fn call(
        &self,
        contract: &str,
        function: ContractFunction,
        token_id: u32,
    ) -> Result<CallValue, CallError>;
}

/// JSON-RPC の eth_call を使う実装
pub struct RpcGateway {
    client: reqwest::blocking::Client,
    url: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (CallParams<'a>, &'static str),
}

#[derive(Serialize)]
struct CallParams<'a> {
    to: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcGateway {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CallError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallError::Transport(Box::new(e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    fn eth_call(
        &self,
        contract: &str,
        function: ContractFunction,
        calldata: Vec<u8>,
    ) -> Result<Vec<u8>, CallError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_call",
            params: (
                CallParams {
                    to: contract,
                    data: hex::encode_prefixed(calldata),
                },
                "latest",
            ),
        };

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| CallError::Transport(Box::new(e)))?;

        if let Some(err) = response.error {
            debug!(
                code = err.code,
                "{} on {} failed: {}",
                function.name(),
                contract,
                err.message
            );
            return Err(classify_rpc_error(function, err));
        }

        let result = response.result.ok_or_else(|| CallError::InvalidReturn {
            function: function.name(),
            reason: "response has neither result nor error".to_string(),
        })?;
        let stripped = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(stripped).map_err(|e| CallError::InvalidReturn {
            function: function.name(),
            reason: e.to_string(),
        })
    }
}

/// revert だけを「トークンなし」とし、レート制限などのノード側エラーは通信障害扱いにする
fn classify_rpc_error(function: ContractFunction, err: RpcErrorObject) -> CallError {
    let reverted = err.code == 3
        || (err.code == -32000 && err.message.to_ascii_lowercase().contains("revert"));
    if reverted {
        CallError::NotFound {
            function: function.name(),
            message: err.message,
        }
    } else {
        CallError::Transport(format!("rpc error {}: {}", err.code, err.message).into())
    }
}

impl ContractGateway for RpcGateway {
    fn call(
        &self,
        contract: &str,
        function: ContractFunction,
        token_id: u32,
    ) -> Result<CallValue, CallError> {
        let id = U256::from(token_id);
        let calldata = match function {
            ContractFunction::TokenUri => tokenURICall { tokenId: id }.abi_encode(),
            ContractFunction::HasIdentityOpenedABox => {
                hasIdentityOpenedABoxCall { identityId: id }.abi_encode()
            }
            ContractFunction::VaultBoxOpenedByIdentity => {
                vaultBoxOpenedByIdentityCall { vaultId: id }.abi_encode()
            }
        };

        let data = self.eth_call(contract, function, calldata)?;
        decode_return(function, &data)
    }
}

/// ABI エンコードされた戻り値を CallValue に変換する
pub fn decode_return(function: ContractFunction, data: &[u8]) -> Result<CallValue, CallError> {
    let invalid = |reason: String| CallError::InvalidReturn {
        function: function.name(),
        reason,
    };

    match function {
        ContractFunction::TokenUri => tokenURICall::abi_decode_returns(data, true)
            .map(|r| CallValue::Text(r._0))
            .map_err(|e| invalid(e.to_string())),
        ContractFunction::HasIdentityOpenedABox => {
            hasIdentityOpenedABoxCall::abi_decode_returns(data, true)
                .map(|r| CallValue::Flag(r._0))
                .map_err(|e| invalid(e.to_string()))
        }
        ContractFunction::VaultBoxOpenedByIdentity => {
            let value = vaultBoxOpenedByIdentityCall::abi_decode_returns(data, true)
                .map_err(|e| invalid(e.to_string()))?
                ._0;
            u64::try_from(value)
                .map(CallValue::Uint)
                .map_err(|_| invalid(format!("{} does not fit in u64", value)))
        }
    }
}
