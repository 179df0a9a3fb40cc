use anyhow::{Context, Result};
use nft_metadata_harvest::config::Config;
use nft_metadata_harvest::consistency::check_collection;

fn main() -> Result<()> {
    let cfg = Config::load("config.yaml").context("config.yaml の読み込みに失敗しました")?;
    let max_examples = 20usize;
    let mut failed = false;

    for &kind in &cfg.collections {
        let report = check_collection(&cfg.output_dir, kind)
            .with_context(|| format!("{:?} の検査に失敗しました", kind))?;

        println!("==============================");
        println!(" Harvest Check: {:?}", kind);
        println!(" Artifacts: {}  Export rows: {}", report.artifacts, report.rows);
        println!("==============================\n");

        for (trait_type, values) in &report.trait_stats {
            println!("▶ Trait: {}", trait_type);

            let mut sorted: Vec<_> = values.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1));

            for (value, count) in sorted {
                let ratio = *count as f64 / report.artifacts as f64 * 100.0;
                println!("  {:30} {:5} ({:.2}%)", value, count, ratio);
            }
            println!();
        }

        if report.is_consistent() {
            println!("✅ JSON とエクスポートは一致しています\n");
            continue;
        }

        failed = true;
        println!("❌ 不整合が見つかりました（最大 {} 件表示）:", max_examples);
        if report.out_of_order {
            println!("  - エクスポートの行が ID 昇順ではありません");
        }
        for id in report.missing_rows.iter().take(max_examples) {
            println!("  - #{} : エクスポートに行がありません", id);
        }
        for id in report.orphan_rows.iter().take(max_examples) {
            println!("  - #{} : 対応する JSON がありません", id);
        }
        for id in report.duplicate_rows.iter().take(max_examples) {
            println!("  - #{} : 行が重複しています", id);
        }
        for m in report.mismatches.iter().take(max_examples) {
            println!(
                "  - #{} : {} が一致しません (json: {:?}, export: {:?})",
                m.token_id, m.column, m.from_json, m.in_export
            );
        }
        println!();
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}
