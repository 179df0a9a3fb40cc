//! 外部サイトの HTML からレア度ランキングを取り出す

use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;

use crate::config::{RankConfig, ID_PLACEHOLDER};

#[derive(Debug, Error)]
pub enum RankError {
    #[error("marker {0:?} not found in page")]
    MarkerNotFound(String),

    #[error("rank field missing after marker")]
    MissingField,

    #[error("rank is not a number: {0}")]
    InvalidNumber(#[from] ParseIntError),

    #[error("page request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub trait RankLookup: Sync {
    fn rank_for(&self, token_id: u32) -> Result<u32, RankError>;
}

/// 1ページ取得してマーカー位置からランクを読む実装
pub struct HtmlRankScraper {
    client: reqwest::blocking::Client,
    url_template: String,
    marker: String,
}

impl HtmlRankScraper {
    pub fn new(config: &RankConfig, timeout: Duration) -> Result<Self, RankError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url_template: config.url_template.clone(),
            marker: config.marker.clone(),
        })
    }

    fn url_for(&self, token_id: u32) -> String {
        self.url_template
            .replace(ID_PLACEHOLDER, &token_id.to_string())
    }
}

impl RankLookup for HtmlRankScraper {
    fn rank_for(&self, token_id: u32) -> Result<u32, RankError> {
        let html = self
            .client
            .get(self.url_for(token_id))
            .send()?
            .error_for_status()?
            .text()?;
        parse_rank(&html, &self.marker)
    }
}

/// マーカー以降を ' ' で区切った4番目のフィールドをランクとして読む
///
/// `<div class="item-rarity-rank"> Rank : 42 </div>` のような構造を想定している。
pub fn parse_rank(html: &str, marker: &str) -> Result<u32, RankError> {
    let start = html
        .find(marker)
        .ok_or_else(|| RankError::MarkerNotFound(marker.to_string()))?;
    let field = html[start..]
        .split(' ')
        .nth(3)
        .ok_or(RankError::MissingField)?;
    Ok(field.trim().parse()?)
}
