//! JBrowse2 metadata on disk.
//!
//! ```text
//! <metadata_dir>/assemblies/<organism>_<assembly>.json
//! <metadata_dir>/tracks/<organism>/<assembly>/<type>/*.json
//! <metadata_dir>/tracks/synteny/<name1>_<name2>/<type>/*.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::AccessTier;

/// Directory under `tracks/` holding pairwise synteny tracks.
pub const SYNTENY_DIR: &str = "synteny";

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("invalid name '{0}'")]
    InvalidName(String),

    #[error("invalid assembly name format '{0}'; expected Organism_Assembly")]
    InvalidAssemblyName(String),

    #[error("assembly metadata directory {0} not found")]
    MissingDirectory(String),

    #[error("assembly definition not found: {0}")]
    AssemblyNotFound(String),

    #[error("invalid assembly definition {path}: {message}")]
    InvalidDefinition { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub assembly_id: Option<String>,
    #[serde(default)]
    pub default_access_level: Option<String>,
    #[serde(default)]
    pub sequence: Option<Value>,
}

impl AssemblyDefinition {
    pub fn declared_level(&self) -> AccessTier {
        AccessTier::from_declared(self.default_access_level.as_deref())
    }
}

/// A track config as stored. Only the access level and the adapter are
/// interpreted; everything else passes through to the viewer untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDefinition(pub Value);

impl TrackDefinition {
    pub fn track_id(&self) -> &str {
        self.0.get("trackId").and_then(Value::as_str).unwrap_or("")
    }

    /// `metadata.access_level`, PUBLIC when absent.
    pub fn declared_level(&self) -> AccessTier {
        let declared = self
            .0
            .get("metadata")
            .and_then(|metadata| metadata.get("access_level"))
            .and_then(Value::as_str);
        AccessTier::from_declared(declared)
    }

    pub fn adapter_mut(&mut self) -> Option<&mut Value> {
        self.0.get_mut("adapter")
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Split `Organism_Assembly` into its parts. Accession-style assembly ids
/// (`GCA_000000000.1`, `GCF_...`) keep their underscore; otherwise the split
/// is on the last underscore.
pub fn parse_assembly_name(full_name: &str) -> Option<(String, String)> {
    if let Some(split) = accession_split(full_name) {
        return Some(split);
    }

    let (organism, assembly) = full_name.rsplit_once('_')?;
    if organism.is_empty() || assembly.is_empty() {
        return None;
    }
    Some((organism.to_string(), assembly.to_string()))
}

fn accession_split(full_name: &str) -> Option<(String, String)> {
    for prefix in ["_GCA_", "_GCF_"] {
        let Some(pos) = full_name.find(prefix) else {
            continue;
        };
        let organism = &full_name[..pos];
        let accession = &full_name[pos + 1..];
        let digits = &accession[4..];
        let Some((major, minor)) = digits.split_once('.') else {
            continue;
        };
        let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !organism.is_empty() && numeric(major) && numeric(minor) {
            return Some((organism.to_string(), accession.to_string()));
        }
    }
    None
}

/// Names arrive from query strings and become path components.
fn checked_name(name: &str) -> Result<&str, MetadataError> {
    let bad = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(MetadataError::InvalidName(name.to_string()));
    }
    Ok(name)
}

pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn assemblies_dir(&self) -> PathBuf {
        self.root.join("assemblies")
    }

    pub fn tracks_dir(&self) -> PathBuf {
        self.root.join("tracks")
    }

    /// Every parseable assembly definition, sorted by file name. Unparseable
    /// files are skipped.
    pub fn list_assemblies(&self) -> Result<Vec<AssemblyDefinition>, MetadataError> {
        let dir = self.assemblies_dir();
        if !dir.is_dir() {
            return Err(MetadataError::MissingDirectory(dir.display().to_string()));
        }

        Ok(json_files(&dir)
            .into_iter()
            .filter_map(|path| match read_json::<AssemblyDefinition>(&path) {
                Ok(def) => Some(def),
                Err(e) => {
                    tracing::warn!("Skipping assembly definition {}: {}", path.display(), e);
                    None
                }
            })
            .collect())
    }

    pub fn load_assembly(&self, organism: &str, assembly: &str) -> Result<AssemblyDefinition, MetadataError> {
        let file_stem = format!("{}_{}", checked_name(organism)?, checked_name(assembly)?);
        let path = self.assemblies_dir().join(format!("{}.json", file_stem));
        if !path.is_file() {
            return Err(MetadataError::AssemblyNotFound(file_stem));
        }
        read_json(&path).map_err(|message| MetadataError::InvalidDefinition {
            path: path.display().to_string(),
            message,
        })
    }

    /// Track configs for one assembly, `tracks/<organism>/<assembly>/*/*.json`.
    pub fn load_tracks(&self, organism: &str, assembly: &str) -> Result<Vec<TrackDefinition>, MetadataError> {
        let dir = self
            .tracks_dir()
            .join(checked_name(organism)?)
            .join(checked_name(assembly)?);
        Ok(load_track_dir(&dir))
    }

    /// Synteny tracks between two assemblies, stored under either ordering of
    /// the pair. Each track comes with the pair directory it was found in.
    pub fn load_synteny_tracks(
        &self,
        first: &str,
        second: &str,
    ) -> Result<Vec<(String, TrackDefinition)>, MetadataError> {
        let (first, second) = (checked_name(first)?, checked_name(second)?);
        let synteny_dir = self.tracks_dir().join(SYNTENY_DIR);

        let mut pairs = vec![format!("{}_{}", first, second)];
        let reversed = format!("{}_{}", second, first);
        if reversed != pairs[0] {
            pairs.push(reversed);
        }

        let mut tracks = Vec::new();
        for pair in pairs {
            for track in load_track_dir(&synteny_dir.join(&pair)) {
                tracks.push((pair.clone(), track));
            }
        }
        Ok(tracks)
    }
}

fn load_track_dir(dir: &Path) -> Vec<TrackDefinition> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut type_dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    type_dirs.sort();

    type_dirs
        .iter()
        .flat_map(|type_dir| json_files(type_dir))
        .filter_map(|path| match read_json::<Value>(&path) {
            Ok(value) if value.is_object() => Some(TrackDefinition(value)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping track config {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    files.sort();
    files
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&contents).map_err(|e| e.to_string())
}
