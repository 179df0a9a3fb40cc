//! 書き出した JSON とエクスポート CSV の突き合わせ

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::metadata::NftMetadata;
use crate::record::{CollectionKind, TokenRecord};

#[derive(Debug, Default)]
pub struct ConsistencyReport {
    pub artifacts: usize,
    pub rows: usize,
    /// JSON はあるがエクスポートに行がない ID
    pub missing_rows: Vec<u32>,
    /// 行はあるが JSON がない ID
    pub orphan_rows: Vec<u32>,
    pub duplicate_rows: Vec<u32>,
    pub out_of_order: bool,
    pub mismatches: Vec<FieldMismatch>,
    /// trait_type -> 値 -> 出現数
    pub trait_stats: BTreeMap<String, BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMismatch {
    pub token_id: u32,
    pub column: String,
    pub from_json: String,
    pub in_export: String,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_rows.is_empty()
            && self.orphan_rows.is_empty()
            && self.duplicate_rows.is_empty()
            && !self.out_of_order
            && self.mismatches.is_empty()
    }
}

pub fn check_collection(dir: &Path, kind: CollectionKind) -> Result<ConsistencyReport> {
    let mut report = ConsistencyReport::default();

    let artifacts = collect_json_files(dir, kind)?;
    report.artifacts = artifacts.len();

    let export_path = dir.join(kind.export_file_name());
    let rows = read_export_rows(&export_path, &mut report)?;

    let header = kind.csv_header();
    let aux = kind.auxiliary_columns();

    for (&token_id, path) in &artifacts {
        let text = fs::read_to_string(path)
            .with_context(|| format!("JSON 読み込み失敗: {:?}", path))?;
        let meta = NftMetadata::from_json(&text)
            .with_context(|| format!("JSON パース失敗: {:?}", path))?;

        for attr in &meta.attributes {
            let value = match &attr.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            *report
                .trait_stats
                .entry(attr.trait_type.clone())
                .or_default()
                .entry(value)
                .or_insert(0) += 1;
        }

        let Some(row) = rows.get(&token_id) else {
            report.missing_rows.push(token_id);
            continue;
        };

        let expected = TokenRecord::from_metadata(kind, token_id, &meta, text).csv_row();
        for (i, column) in header.iter().enumerate() {
            if aux.contains(column) {
                continue;
            }
            let in_export = row.get(i).cloned().unwrap_or_default();
            if expected[i] != in_export {
                report.mismatches.push(FieldMismatch {
                    token_id,
                    column: column.to_string(),
                    from_json: expected[i].clone(),
                    in_export,
                });
            }
        }
    }

    report.orphan_rows = rows
        .keys()
        .filter(|id| !artifacts.contains_key(id))
        .copied()
        .collect();

    Ok(report)
}

/// ディレクトリ直下の <Prefix>-<id>.json を ID 順に列挙
fn collect_json_files(dir: &Path, kind: CollectionKind) -> Result<BTreeMap<u32, PathBuf>> {
    let prefix = format!("{}-", kind.file_prefix());
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let id = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
            .and_then(|id| id.parse::<u32>().ok());
        if let Some(id) = id {
            files.insert(id, path);
        }
    }
    Ok(files)
}

fn read_export_rows(
    path: &Path,
    report: &mut ConsistencyReport,
) -> Result<HashMap<u32, Vec<String>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("エクスポートが読めません: {:?}", path))?;

    let mut rows = HashMap::new();
    let mut last_id: Option<u32> = None;
    for record in reader.records() {
        let record = record.with_context(|| format!("CSV パース失敗: {:?}", path))?;
        report.rows += 1;

        let id: u32 = record
            .get(0)
            .unwrap_or_default()
            .parse()
            .with_context(|| format!("Id 列が数値ではありません: {:?}", record))?;

        if last_id.is_some_and(|last| id <= last) {
            report.out_of_order = true;
        }
        last_id = Some(id);

        let fields = record.iter().map(|f| f.to_string()).collect();
        if rows.insert(id, fields).is_some() {
            report.duplicate_rows.push(id);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_export;

    fn seed(dir: &Path, id: u32, json: &str) -> Vec<String> {
        fs::write(dir.join(format!("Character-{}.json", id)), json).unwrap();
        let meta = NftMetadata::from_json(json).unwrap();
        TokenRecord::from_metadata(CollectionKind::Identities, id, &meta, json.to_string())
            .csv_row()
    }

    #[test]
    fn consistent_output_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let a = seed(
            tmp.path(),
            1,
            r#"{"name":"A","attributes":[{"trait_type":"Class","value":"Hacker"}]}"#,
        );
        let mut b = seed(
            tmp.path(),
            4,
            r#"{"name":"B","attributes":[{"trait_type":"Class","value":"Hacker"}]}"#,
        );
        // 補助列は比較対象外
        b[15] = "true".into();
        b[16] = "12".into();
        let export = tmp.path().join("Characters.csv");
        write_export(&export, CollectionKind::Identities, &[a, b]).unwrap();

        let report = check_collection(tmp.path(), CollectionKind::Identities).unwrap();
        assert!(report.is_consistent(), "{:?}", report);
        assert_eq!(report.artifacts, 2);
        assert_eq!(report.rows, 2);
        assert_eq!(report.trait_stats["Class"]["Hacker"], 2);
    }

    #[test]
    fn detects_missing_orphan_and_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = seed(
            tmp.path(),
            2,
            r#"{"name":"A","attributes":[{"trait_type":"Strength","value":5}]}"#,
        );
        seed(tmp.path(), 3, r#"{"name":"C","attributes":[]}"#);
        a[8] = "6".into();
        let mut orphan = a.clone();
        orphan[0] = "9".into();
        let export = tmp.path().join("Characters.csv");
        write_export(&export, CollectionKind::Identities, &[a, orphan]).unwrap();

        let report = check_collection(tmp.path(), CollectionKind::Identities).unwrap();
        assert!(!report.is_consistent());
        assert_eq!(report.missing_rows, vec![3]);
        assert_eq!(report.orphan_rows, vec![9]);
        assert_eq!(
            report.mismatches,
            vec![FieldMismatch {
                token_id: 2,
                column: "Strength".into(),
                from_json: "5".into(),
                in_export: "6".into(),
            }]
        );
    }

    #[test]
    fn detects_unordered_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let a = seed(tmp.path(), 5, r#"{"name":"A","attributes":[]}"#);
        let b = seed(tmp.path(), 2, r#"{"name":"B","attributes":[]}"#);
        let export = tmp.path().join("Characters.csv");
        write_export(&export, CollectionKind::Identities, &[a, b]).unwrap();

        let report = check_collection(tmp.path(), CollectionKind::Identities).unwrap();
        assert!(report.out_of_order);
        assert!(report.missing_rows.is_empty());
    }
}
