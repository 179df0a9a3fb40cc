use anyhow::{Context, Result};
use std::path::Path;

use crate::record::CollectionKind;

/// ヘッダ1行 + トークン1件1行の CSV を書き出す
pub fn write_export(path: &Path, kind: CollectionKind, rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("エクスポートファイルを作成できません: {:?}", path))?;

    writer.write_record(kind.csv_header())?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("エクスポートの書き込みに失敗しました: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn values_with_delimiters_are_quoted() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Vaults.csv");
        let rows = vec![vec![
            "1".to_string(),
            "10".to_string(),
            "0.1%".to_string(),
            "Gun, Medkit".to_string(),
            "2".to_string(),
            "0".to_string(),
        ]];
        write_export(&path, CollectionKind::Vaults, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Id,Credits,CreditSupplyProportion,AdditionalItem,CreditMultiplier,OpenedBy")
        );
        assert_eq!(lines.next(), Some(r#"1,10,0.1%,"Gun, Medkit",2,0"#));
        assert_eq!(lines.next(), None);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[3], "Gun, Medkit");
    }

    #[test]
    fn empty_run_still_has_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Characters.csv");
        write_export(&path, CollectionKind::Identities, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Id,Name,Status,"));
    }
}
