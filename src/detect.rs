//! Column role detection by header-name similarity.
//!
//! Suggestions are advisory: nothing in the pipeline applies them unless the
//! caller explicitly asks for it.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use similar::TextDiff;

use crate::{plan::ComparisonPair, source::SourceTable};

pub const DEFAULT_SUGGESTIONS: usize = 5;

const ID_KEYWORDS: &[&str] = &[
    "id", "sku", "kode", "code", "barcode", "artikel", "no", "nomor", "number", "ref", "item",
];
const PRICE_KEYWORDS: &[&str] = &[
    "harga",
    "price",
    "amount",
    "cost",
    "nilai",
    "rate",
    "web",
    "shopee",
    "tokped",
    "tiktok",
    "tokopedia",
];
const BRAND_KEYWORDS: &[&str] = &[
    "brand",
    "merk",
    "merek",
    "vendor",
    "manufaktur",
    "manufacturer",
];
const CATEGORY_KEYWORDS: &[&str] = &[
    "kategori", "category", "cat", "tipe", "type", "jenis", "group", "grup", "divisi", "kelas",
];
const NAME_KEYWORDS: &[&str] = &[
    "nama",
    "name",
    "produk",
    "product",
    "item",
    "title",
    "judul",
    "description",
    "deskripsi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Identifier,
    Price,
    Brand,
    Category,
    Name,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Identifier,
        Role::Price,
        Role::Brand,
        Role::Category,
        Role::Name,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Role::Identifier => ID_KEYWORDS,
            Role::Price => PRICE_KEYWORDS,
            Role::Brand => BRAND_KEYWORDS,
            Role::Category => CATEGORY_KEYWORDS,
            Role::Name => NAME_KEYWORDS,
        }
    }

    /// Header used for a metadata column detected under this role.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Identifier => "SKU/ID",
            Role::Price => "Price",
            Role::Brand => "Brand",
            Role::Category => "Category",
            Role::Name => "Product Name",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Identifier => "identifier",
            Role::Price => "price",
            Role::Brand => "brand",
            Role::Category => "category",
            Role::Name => "name",
        };
        f.write_str(label)
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" | "identifier" | "sku" => Ok(Role::Identifier),
            "price" | "harga" => Ok(Role::Price),
            "brand" | "merk" => Ok(Role::Brand),
            "category" | "kategori" => Ok(Role::Category),
            "name" | "nama" => Ok(Role::Name),
            other => Err(anyhow!(
                "Unknown column role '{other}' (expected id, price, brand, category or name)"
            )),
        }
    }
}

/// A column together with its best similarity against a role's keywords.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredColumn {
    pub column: String,
    pub score: f32,
}

/// Similarity ratio in `[0, 1]`: twice the matched characters of a minimal
/// character diff divided by the combined length of both strings.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

pub fn role_score(column: &str, role: Role) -> f32 {
    role.keywords()
        .iter()
        .map(|keyword| similarity(column, keyword))
        .fold(0.0f32, f32::max)
}

/// Scores every column for `role`, best first. The sort is stable, so equal
/// scores keep their original column order.
pub fn rank<S: AsRef<str>>(columns: &[S], role: Role) -> Vec<ScoredColumn> {
    let mut scored = columns
        .iter()
        .map(|column| ScoredColumn {
            column: column.as_ref().to_string(),
            score: role_score(column.as_ref(), role),
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

pub fn suggest(table: &SourceTable, role: Role) -> Vec<String> {
    rank(table.headers(), role)
        .into_iter()
        .take(DEFAULT_SUGGESTIONS)
        .map(|scored| scored.column)
        .collect()
}

pub fn best(table: &SourceTable, role: Role) -> Option<String> {
    rank(table.headers(), role)
        .into_iter()
        .next()
        .map(|scored| scored.column)
}

/// Metadata columns a Portal table most likely carries, in role order
/// (name, brand, category), excluding `exclude` and repeated picks.
pub fn detect_metadata(table: &SourceTable, exclude: &[&str]) -> Vec<(Role, String)> {
    let mut picked: Vec<(Role, String)> = Vec::new();
    for role in [Role::Name, Role::Brand, Role::Category] {
        if let Some(column) = best(table, role)
            && !exclude.contains(&column.as_str())
            && !picked.iter().any(|(_, existing)| existing == &column)
        {
            picked.push((role, column));
        }
    }
    picked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Marketplace {
    Shopee,
    Tokopedia,
    TikTok,
    Web,
    Lazada,
    Blibli,
}

impl Marketplace {
    pub const ALL: [Marketplace; 6] = [
        Marketplace::Shopee,
        Marketplace::Tokopedia,
        Marketplace::TikTok,
        Marketplace::Web,
        Marketplace::Lazada,
        Marketplace::Blibli,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Marketplace::Shopee => &["shopee", "shp"],
            Marketplace::Tokopedia => &["tokopedia", "tokped", "toped"],
            Marketplace::TikTok => &["tiktok", "tik tok", "tt"],
            Marketplace::Web => &["web", "website"],
            Marketplace::Lazada => &["lazada", "lzd"],
            Marketplace::Blibli => &["blibli"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Marketplace::Shopee => "Shopee",
            Marketplace::Tokopedia => "Tokopedia",
            Marketplace::TikTok => "TikTok",
            Marketplace::Web => "Web",
            Marketplace::Lazada => "Lazada",
            Marketplace::Blibli => "Blibli",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First marketplace whose keyword occurs in the lower-cased column name.
pub fn detect_marketplace(column: &str) -> Option<Marketplace> {
    let lower = column.to_lowercase();
    Marketplace::ALL
        .into_iter()
        .find(|marketplace| marketplace.keywords().iter().any(|k| lower.contains(k)))
}

/// Proposes one pair per marketplace seen in both tables, labelled with the
/// marketplace name and using the first matching column on each side.
pub fn suggest_pairs(portal: &SourceTable, omni: &SourceTable) -> Vec<ComparisonPair> {
    let first_for = |table: &SourceTable, marketplace: Marketplace| {
        table
            .headers()
            .iter()
            .find(|column| detect_marketplace(column) == Some(marketplace))
            .cloned()
    };
    Marketplace::ALL
        .into_iter()
        .filter_map(|marketplace| {
            let portal_column = first_for(portal, marketplace)?;
            let omni_column = first_for(omni, marketplace)?;
            Some(ComparisonPair::new(
                marketplace.name(),
                portal_column,
                omni_column,
            ))
        })
        .collect()
}
