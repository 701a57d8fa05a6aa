use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    join::JoinMode,
    normalize::PricePolicy,
    plan::{ComparisonPair, MetadataColumn},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omni_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinMode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pairs: Vec<ComparisonPair>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataColumn>,
    pub auto_metadata: bool,
    pub auto_pairs: bool,
    pub policy: PricePolicy,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path).with_context(|| format!("Opening run file {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .with_context(|| format!("Reading run file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing run file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating run file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
