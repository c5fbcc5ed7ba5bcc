use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{common::write_atomic, map::Level};

pub(crate) const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHash {
    pub sha256: String,
}

/// Per-level entry: graph size and the hashes of the level's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub nodes: usize,
    pub edges: usize,
    pub files: BTreeMap<String, FileHash>,
}

/// `manifest.json`: one entry per level built into the output directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub levels: BTreeMap<Level, LevelEntry>,
}

impl Manifest {
    /// Read the manifest in `dir`, or start an empty one.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self { version: "1".into(), levels: BTreeMap::new() });
        }
        let bytes = fs::read(&path)
            .with_context(|| format!("[io::graph::manifest] Failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("[io::graph::manifest] Failed to parse {}", path.display()))
    }

    pub(crate) fn save(&self, dir: &Path) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        write_atomic(&dir.join(MANIFEST_FILE), &bytes)
    }
}
