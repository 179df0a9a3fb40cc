use anyhow::{bail, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::record::CollectionKind;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    /// 実行前の整合性チェック
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            bail!("rpc_url が空です");
        }
        if self.collections.is_empty() {
            bail!("collections に少なくとも1つ指定してください");
        }
        if self.workers == 0 {
            bail!("workers は 1 以上を指定してください");
        }
        if self.ids.start >= self.ids.end {
            bail!(
                "ids の範囲が不正です: start {} >= end {}",
                self.ids.start,
                self.ids.end
            );
        }
        if let Some(rank) = &self.rank {
            if !rank.url_template.contains(ID_PLACEHOLDER) {
                bail!(
                    "rank.url_template に {} が含まれていません: {}",
                    ID_PLACEHOLDER,
                    rank.url_template
                );
            }
        }
        Ok(())
    }

    /// コレクション種別に対応するコントラクトアドレス
    pub fn contract_for(&self, kind: CollectionKind) -> &str {
        match kind {
            CollectionKind::Identities => &self.contracts.identities,
            CollectionKind::Vaults => &self.contracts.vaults,
        }
    }
}

pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub rpc_url: String,
    pub collections: Vec<CollectionKind>,
    #[serde(default)]
    pub ids: IdRange,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub output_dir: PathBuf,
    pub contracts: ContractsConfig,
    pub rank: Option<RankConfig>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// 走査するトークンIDの半開区間 [start, end)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl Default for IdRange {
    fn default() -> Self {
        Self {
            start: 0,
            end: DEFAULT_COLLECTION_SIZE,
        }
    }
}

pub const DEFAULT_COLLECTION_SIZE: u32 = 2500;

#[derive(Debug, Deserialize)]
pub struct ContractsConfig {
    pub identities: String,
    pub vaults: String,
    /// 開封状況を持つ補助コントラクト
    pub bytes: String,
}

#[derive(Debug, Deserialize)]
pub struct RankConfig {
    pub url_template: String,
    #[serde(default = "default_rank_marker")]
    pub marker: String,
}

fn default_workers() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rank_marker() -> String {
    "item-rarity-rank".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
rpc_url: "http://localhost:8545"
collections: [identities, vaults]
output_dir: "out"
contracts:
  identities: "0x86357A19E5537A8Fba9A004E555713BC943a66C0"
  vaults: "0xab0b0dd7e4eab0f9e31a539074a03f1c1be80879"
  bytes: "0x7d647b1A0dcD5525e9C6B3D14BE58f27674f8c95"
rank:
  url_template: "https://example.com/item?id={id}"
"#;

    #[test]
    fn defaults_are_applied() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.ids.start, 0);
        assert_eq!(cfg.ids.end, 2500);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.rank.as_ref().unwrap().marker, "item-rarity-rank");
        assert_eq!(
            cfg.collections,
            vec![CollectionKind::Identities, CollectionKind::Vaults]
        );
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_empty_range_and_zero_workers() {
        let mut cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        cfg.ids = IdRange { start: 10, end: 10 };
        assert!(cfg.validate().is_err());

        let mut cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        cfg.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rank_template_needs_placeholder() {
        let mut cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        cfg.rank.as_mut().unwrap().url_template = "https://example.com/item".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn contract_lookup_follows_kind() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(
            cfg.contract_for(CollectionKind::Vaults),
            "0xab0b0dd7e4eab0f9e31a539074a03f1c1be80879"
        );
    }
}
