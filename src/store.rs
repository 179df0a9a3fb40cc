use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::record::{CollectionKind, TokenRecord};

/// トークンごとの JSON / SVG を置く出力ディレクトリ
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("出力ディレクトリの作成に失敗しました: {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn json_path(&self, kind: CollectionKind, token_id: u32) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", kind.file_prefix(), token_id))
    }

    pub fn image_path(&self, kind: CollectionKind, token_id: u32) -> PathBuf {
        self.dir
            .join(format!("{}-{}.svg", kind.file_prefix(), token_id))
    }

    pub fn export_path(&self, kind: CollectionKind) -> PathBuf {
        self.dir.join(kind.export_file_name())
    }

    /// デコード済み JSON をそのまま、画像があれば画像も書き出す
    pub fn save(&self, record: &TokenRecord) -> Result<()> {
        let kind = record.kind();
        let id = record.id();

        let json_path = self.json_path(kind, id);
        fs::write(&json_path, record.raw_json())
            .with_context(|| format!("メタデータの書き込みに失敗しました: {:?}", json_path))?;

        match record.image() {
            Some(image) => {
                let image_path = self.image_path(kind, id);
                fs::write(&image_path, image)
                    .with_context(|| format!("画像の保存に失敗しました: {:?}", image_path))?;
            }
            None => debug!("token #{}: no image to save", id),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::NftMetadata;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    #[test]
    fn writes_raw_json_and_image() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(&tmp.path().join("nested")).unwrap();

        let raw = format!(
            r#"{{"name":"Vault #5","attributes":[],"image":"data:image/svg+xml;base64,{}"}}"#,
            STANDARD.encode("<svg/>")
        );
        let meta = NftMetadata::from_json(&raw).unwrap();
        let record = TokenRecord::from_metadata(CollectionKind::Vaults, 5, &meta, raw.clone());
        store.save(&record).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("nested/Vault-5.json")).unwrap(), raw);
        assert_eq!(fs::read(tmp.path().join("nested/Vault-5.svg")).unwrap(), b"<svg/>");
    }

    #[test]
    fn skips_image_file_without_image() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::create(tmp.path()).unwrap();

        let raw = r#"{"name":"X","attributes":[]}"#;
        let meta = NftMetadata::from_json(raw).unwrap();
        let record =
            TokenRecord::from_metadata(CollectionKind::Identities, 3, &meta, raw.to_string());
        store.save(&record).unwrap();

        assert!(store.json_path(CollectionKind::Identities, 3).exists());
        assert!(!store.image_path(CollectionKind::Identities, 3).exists());
    }
}
