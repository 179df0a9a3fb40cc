use nft_metadata_harvest::config::Config;
use nft_metadata_harvest::gateway::RpcGateway;
use nft_metadata_harvest::harvest::harvest;
use nft_metadata_harvest::rank::{HtmlRankScraper, RankLookup};

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::load("config.yaml")
        .context("config.yaml の読み込みに失敗しました")?;
    cfg.validate().context("config.yaml の内容が不正です")?;

    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let gateway = RpcGateway::new(&cfg.rpc_url, timeout)
        .context("RPC クライアントの作成に失敗しました")?;
    let scraper = match &cfg.rank {
        Some(rank) => Some(
            HtmlRankScraper::new(rank, timeout)
                .context("ランク取得用クライアントの作成に失敗しました")?,
        ),
        None => None,
    };
    let ranks = scraper.as_ref().map(|s| s as &dyn RankLookup);

    for &kind in &cfg.collections {
        let summary = harvest(&cfg, kind, &gateway, ranks)
            .with_context(|| format!("{:?} の収集が中断されました", kind))?;

        info!(
            "✅ {:?}: {} exported, {} absent, {} undecodable -> {:?}",
            summary.kind,
            summary.complete,
            summary.absent,
            summary.undecodable,
            summary.export_path
        );
    }

    Ok(())
}
