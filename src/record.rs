use serde::Deserialize;
use tracing::warn;

use crate::data_uri;
use crate::metadata::NftMetadata;

/// 収集対象のコレクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Identities,
    Vaults,
}

const CHARACTER_HEADER: &[&str] = &[
    "Id",
    "Name",
    "Status",
    "Class",
    "Gender",
    "Race",
    "Ability",
    "Eyes",
    "Strength",
    "Intelligence",
    "Attractiveness",
    "Tech Skill",
    "Cool",
    "Credits",
    "Credit Yield",
    "Opened Vault",
    "Rarity",
];

const VAULT_HEADER: &[&str] = &[
    "Id",
    "Credits",
    "CreditSupplyProportion",
    "AdditionalItem",
    "CreditMultiplier",
    "OpenedBy",
];

impl CollectionKind {
    /// 成果物ファイル名の接頭辞（Character-12.json など）
    pub fn file_prefix(self) -> &'static str {
        match self {
            CollectionKind::Identities => "Character",
            CollectionKind::Vaults => "Vault",
        }
    }

    pub fn export_file_name(self) -> &'static str {
        match self {
            CollectionKind::Identities => "Characters.csv",
            CollectionKind::Vaults => "Vaults.csv",
        }
    }

    /// ログ表示用の名前
    pub fn label(self) -> &'static str {
        match self {
            CollectionKind::Identities => "Citizen",
            CollectionKind::Vaults => "Vault",
        }
    }

    pub fn csv_header(self) -> &'static [&'static str] {
        match self {
            CollectionKind::Identities => CHARACTER_HEADER,
            CollectionKind::Vaults => VAULT_HEADER,
        }
    }

    /// メタデータ以外（補助呼び出し）から埋まる列
    pub fn auxiliary_columns(self) -> &'static [&'static str] {
        match self {
            CollectionKind::Identities => &["Opened Vault", "Rarity"],
            CollectionKind::Vaults => &["OpenedBy"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRecord {
    pub id: u32,
    pub name: String,
    pub status: Option<String>,
    pub class: Option<String>,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub ability: Option<String>,
    pub eyes: Option<String>,
    pub strength: Option<i32>,
    pub intelligence: Option<i32>,
    pub attractiveness: Option<i32>,
    pub tech_skill: Option<i32>,
    pub cool: Option<i32>,
    pub credits: Option<i32>,
    pub credit_yield: Option<String>,
    pub image: Option<Vec<u8>>,
    pub raw_json: String,
    pub opened_vault: bool,
    pub rarity: Option<u32>,
}

impl CharacterRecord {
    /// 補助情報（opened_vault / rarity）は未設定のまま構築する
    pub fn from_metadata(id: u32, meta: &NftMetadata, raw_json: String) -> Self {
        Self {
            id,
            name: meta.name.clone(),
            status: meta.text("Status"),
            class: meta.text("Class"),
            gender: meta.text("Gender"),
            race: meta.text("Race"),
            ability: meta.text("Ability"),
            eyes: meta.text("Eyes"),
            strength: meta.integer("Strength"),
            intelligence: meta.integer("Intelligence"),
            attractiveness: meta.integer("Attractiveness"),
            tech_skill: meta.integer("Tech Skill"),
            cool: meta.integer("Cool"),
            credits: meta.integer("Credits"),
            credit_yield: meta.text("Credit Yield"),
            image: decode_image(id, meta),
            raw_json,
            opened_vault: false,
            rarity: None,
        }
    }

    pub fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            text_cell(&self.status),
            text_cell(&self.class),
            text_cell(&self.gender),
            text_cell(&self.race),
            text_cell(&self.ability),
            text_cell(&self.eyes),
            int_cell(self.strength),
            int_cell(self.intelligence),
            int_cell(self.attractiveness),
            int_cell(self.tech_skill),
            int_cell(self.cool),
            int_cell(self.credits),
            text_cell(&self.credit_yield),
            self.opened_vault.to_string(),
            self.rarity.map(|r| r.to_string()).unwrap_or_default(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VaultRecord {
    pub id: u32,
    pub credits: Option<i32>,
    pub credit_supply_proportion: Option<String>,
    pub additional_item: Option<String>,
    pub credit_multiplier: Option<String>,
    pub image: Option<Vec<u8>>,
    pub raw_json: String,
    /// 開封したアイデンティティの ID（未開封は 0）
    pub opened_by: u64,
}

impl VaultRecord {
    pub fn from_metadata(id: u32, meta: &NftMetadata, raw_json: String) -> Self {
        Self {
            id,
            credits: meta.integer("Credits"),
            credit_supply_proportion: meta.text("Credit Supply Proportion"),
            additional_item: meta.text("Additional Item"),
            credit_multiplier: meta.text("Credit Multiplier"),
            image: decode_image(id, meta),
            raw_json,
            opened_by: 0,
        }
    }

    pub fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            int_cell(self.credits),
            text_cell(&self.credit_supply_proportion),
            text_cell(&self.additional_item),
            text_cell(&self.credit_multiplier),
            self.opened_by.to_string(),
        ]
    }
}

/// 1トークン分の収集結果
#[derive(Debug, Clone, PartialEq)]
pub enum TokenRecord {
    Character(CharacterRecord),
    Vault(VaultRecord),
}

impl TokenRecord {
    pub fn from_metadata(
        kind: CollectionKind,
        id: u32,
        meta: &NftMetadata,
        raw_json: String,
    ) -> Self {
        match kind {
            CollectionKind::Identities => {
                TokenRecord::Character(CharacterRecord::from_metadata(id, meta, raw_json))
            }
            CollectionKind::Vaults => {
                TokenRecord::Vault(VaultRecord::from_metadata(id, meta, raw_json))
            }
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            TokenRecord::Character(c) => c.id,
            TokenRecord::Vault(v) => v.id,
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            TokenRecord::Character(_) => CollectionKind::Identities,
            TokenRecord::Vault(_) => CollectionKind::Vaults,
        }
    }

    pub fn raw_json(&self) -> &str {
        match self {
            TokenRecord::Character(c) => &c.raw_json,
            TokenRecord::Vault(v) => &v.raw_json,
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        match self {
            TokenRecord::Character(c) => c.image.as_deref(),
            TokenRecord::Vault(v) => v.image.as_deref(),
        }
    }

    pub fn csv_row(&self) -> Vec<String> {
        match self {
            TokenRecord::Character(c) => c.csv_row(),
            TokenRecord::Vault(v) => v.csv_row(),
        }
    }
}

/// 画像は壊れていてもトークン自体は捨てない
fn decode_image(id: u32, meta: &NftMetadata) -> Option<Vec<u8>> {
    let uri = meta.image.as_deref()?;
    match data_uri::decode(uri) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!("⚠ token #{}: image could not be decoded: {}", id, err);
            None
        }
    }
}

fn text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn int_cell(value: Option<i32>) -> String {
    value.unwrap_or(0).to_string()
}
