//! トークン1件分の取得・デコード・補助情報の付与

use thiserror::Error;
use tracing::{info, warn};

use crate::data_uri::{self, DataUriError};
use crate::gateway::{CallError, CallValue, ContractFunction, ContractGateway};
use crate::metadata::NftMetadata;
use crate::rank::RankLookup;
use crate::record::{CollectionKind, TokenRecord};

/// メタデータを記録にできなかった理由
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed data URI: {0}")]
    MalformedDataUri(#[from] DataUriError),

    #[error("malformed metadata JSON: {0}")]
    MalformedMetadataJson(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidReturn(CallError),
}

/// 1トークンの処理結果
#[derive(Debug)]
pub enum FetchOutcome {
    Complete(TokenRecord),
    /// 主または補助コントラクトにトークンが存在しない
    Absent { function: ContractFunction },
    Undecodable(DecodeError),
}

/// 通信障害など、バッチ全体を止めるエラー
#[derive(Debug, Error)]
#[error("token #{token_id}: {function} failed: {source}")]
pub struct FetchError {
    pub token_id: u32,
    pub function: &'static str,
    #[source]
    pub source: CallError,
}

pub struct TokenFetcher<'a> {
    pub kind: CollectionKind,
    pub collection_contract: &'a str,
    pub bytes_contract: &'a str,
    pub gateway: &'a dyn ContractGateway,
    pub ranks: Option<&'a dyn RankLookup>,
}

/// 呼び出し結果の振り分け
enum Step<T> {
    Value(T),
    Stop(FetchOutcome),
}

impl TokenFetcher<'_> {
    pub fn fetch(&self, token_id: u32) -> Result<FetchOutcome, FetchError> {
        // Fetching
        let uri = match self.call(
            self.collection_contract,
            ContractFunction::TokenUri,
            token_id,
            |v, f| v.into_text(f),
        )? {
            Step::Value(uri) => uri,
            Step::Stop(outcome) => return Ok(outcome),
        };

        info!("Processing: {} #{}", self.kind.label(), token_id);

        // Decoding
        let mut record = match decode_record(self.kind, token_id, &uri) {
            Ok(record) => record,
            Err(err) => return Ok(FetchOutcome::Undecodable(err)),
        };

        // EnrichingAux
        match &mut record {
            TokenRecord::Character(character) => {
                character.opened_vault = match self.call(
                    self.bytes_contract,
                    ContractFunction::HasIdentityOpenedABox,
                    token_id,
                    |v, f| v.into_flag(f),
                )? {
                    Step::Value(flag) => flag,
                    Step::Stop(outcome) => return Ok(outcome),
                };
                character.rarity = self.lookup_rank(token_id);
            }
            TokenRecord::Vault(vault) => {
                vault.opened_by = match self.call(
                    self.bytes_contract,
                    ContractFunction::VaultBoxOpenedByIdentity,
                    token_id,
                    |v, f| v.into_uint(f),
                )? {
                    Step::Value(id) => id,
                    Step::Stop(outcome) => return Ok(outcome),
                };
            }
        }

        Ok(FetchOutcome::Complete(record))
    }

    fn call<T>(
        &self,
        contract: &str,
        function: ContractFunction,
        token_id: u32,
        extract: impl FnOnce(CallValue, ContractFunction) -> Result<T, CallError>,
    ) -> Result<Step<T>, FetchError> {
        let result = self
            .gateway
            .call(contract, function, token_id)
            .and_then(|value| extract(value, function));

        match result {
            Ok(value) => Ok(Step::Value(value)),
            Err(CallError::NotFound { .. }) => {
                info!("Token with ID #{} not found ({}).", token_id, function.name());
                Ok(Step::Stop(FetchOutcome::Absent { function }))
            }
            Err(err @ CallError::InvalidReturn { .. }) => {
                Ok(Step::Stop(FetchOutcome::Undecodable(DecodeError::InvalidReturn(err))))
            }
            Err(source @ CallError::Transport(_)) => Err(FetchError {
                token_id,
                function: function.name(),
                source,
            }),
        }
    }

    /// ランク取得の失敗はこの項目だけ空にする
    fn lookup_rank(&self, token_id: u32) -> Option<u32> {
        let ranks = self.ranks?;
        match ranks.rank_for(token_id) {
            Ok(rank) => Some(rank),
            Err(err) => {
                warn!("⚠ token #{}: rarity rank unavailable: {}", token_id, err);
                None
            }
        }
    }
}

/// tokenURI の戻り値から記録を組み立てる。raw_json はデコードした文字列そのもの
pub fn decode_record(
    kind: CollectionKind,
    token_id: u32,
    uri: &str,
) -> Result<TokenRecord, DecodeError> {
    let raw_json = data_uri::decode_text(uri)?;
    let meta = NftMetadata::from_json(&raw_json)?;
    Ok(TokenRecord::from_metadata(kind, token_id, &meta, raw_json))
}
