//! ID 範囲全体を走査して成果物とエクスポートを作る

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::Config;
use crate::export::write_export;
use crate::fetch::{FetchOutcome, TokenFetcher};
use crate::gateway::ContractGateway;
use crate::rank::RankLookup;
use crate::record::CollectionKind;
use crate::store::ArtifactStore;

#[derive(Debug)]
pub struct HarvestSummary {
    pub kind: CollectionKind,
    pub complete: usize,
    pub absent: usize,
    pub undecodable: usize,
    pub export_path: PathBuf,
}

/// 1トークン分の処理結果（書き込み済み）
enum Handled {
    Row(Vec<String>),
    Absent,
    Undecodable,
}

pub fn harvest(
    cfg: &Config,
    kind: CollectionKind,
    gateway: &dyn ContractGateway,
    ranks: Option<&dyn RankLookup>,
) -> Result<HarvestSummary> {
    let store = ArtifactStore::create(&cfg.output_dir)?;
    let fetcher = TokenFetcher {
        kind,
        collection_contract: cfg.contract_for(kind),
        bytes_contract: &cfg.contracts.bytes,
        gateway,
        ranks,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.workers)
        .build()
        .context("ワーカープールの作成に失敗しました")?;

    info!(
        "Harvesting {:?} #{}..#{} with {} worker(s) into {:?}",
        kind,
        cfg.ids.start,
        cfg.ids.end,
        cfg.workers,
        store.dir()
    );

    // インデックス付きの collect なので結果は ID 昇順に並ぶ
    let handled: Vec<Handled> = pool.install(|| {
        (cfg.ids.start..cfg.ids.end)
            .into_par_iter()
            .map(|token_id| handle_one(&fetcher, &store, token_id))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut rows = Vec::new();
    let mut absent = 0;
    let mut undecodable = 0;
    for h in handled {
        match h {
            Handled::Row(row) => rows.push(row),
            Handled::Absent => absent += 1,
            Handled::Undecodable => undecodable += 1,
        }
    }

    let export_path = store.export_path(kind);
    write_export(&export_path, kind, &rows)?;

    Ok(HarvestSummary {
        kind,
        complete: rows.len(),
        absent,
        undecodable,
        export_path,
    })
}

fn handle_one(fetcher: &TokenFetcher<'_>, store: &ArtifactStore, token_id: u32) -> Result<Handled> {
    match fetcher.fetch(token_id)? {
        FetchOutcome::Complete(record) => {
            store
                .save(&record)
                .with_context(|| format!("トークン #{} の保存に失敗しました", token_id))?;
            Ok(Handled::Row(record.csv_row()))
        }
        FetchOutcome::Absent { .. } => Ok(Handled::Absent),
        FetchOutcome::Undecodable(err) => {
            warn!("⚠ token #{} skipped: {}", token_id, err);
            Ok(Handled::Undecodable)
        }
    }
}
