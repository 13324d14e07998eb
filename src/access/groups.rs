//! Organism/assembly → group membership, backed by a JSON file.
//!
//! The file is a list of `{organism, assembly, groups: [..]}` objects. Admin
//! tooling rewrites it in place, so reads tolerate missing or half-written
//! files by treating them as empty.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Reserved group whose members are visible to every tier.
pub const PUBLIC_GROUP: &str = "Public";

/// One (organism, assembly) pair and the groups it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGroupEntry {
    pub organism: String,
    pub assembly: String,
    pub groups: BTreeSet<String>,
}

impl ResourceGroupEntry {
    pub fn new(organism: &str, assembly: &str, groups: &[&str]) -> Self {
        Self {
            organism: organism.to_string(),
            assembly: assembly.to_string(),
            groups: groups.iter().map(|g| canonical_group(g)).collect(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.groups.contains(PUBLIC_GROUP)
    }
}

#[derive(Deserialize)]
struct RawEntry {
    organism: Option<String>,
    assembly: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
}

/// Map any casing of the reserved group onto [`PUBLIC_GROUP`].
pub fn canonical_group(name: &str) -> String {
    let name = name.trim();
    if name.eq_ignore_ascii_case(PUBLIC_GROUP) {
        PUBLIC_GROUP.to_string()
    } else {
        name.to_string()
    }
}

/// Parse the group file contents. Entries without an organism or assembly
/// are dropped.
pub fn parse_groups(contents: &str) -> Result<Vec<ResourceGroupEntry>, serde_json::Error> {
    let raw: Vec<RawEntry> = serde_json::from_str(contents)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| {
            let organism = entry.organism.filter(|o| !o.is_empty())?;
            let assembly = entry.assembly.filter(|a| !a.is_empty())?;
            Some(ResourceGroupEntry {
                organism,
                assembly,
                groups: entry.groups.iter().map(|g| canonical_group(g)).collect(),
            })
        })
        .collect())
}

/// Read and parse the group file. Failures yield an empty list and a warning.
pub fn load_groups(path: &Path) -> Vec<ResourceGroupEntry> {
    match try_load(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Resource group file {} unusable, treating as empty: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn try_load(path: &Path) -> anyhow::Result<Vec<ResourceGroupEntry>> {
    let contents = fs::read_to_string(path)?;
    Ok(parse_groups(&contents)?)
}

/// Immutable view of the group file used for access decisions.
#[derive(Debug, Clone, Default)]
pub struct GroupSnapshot {
    entries: Vec<ResourceGroupEntry>,
}

impl GroupSnapshot {
    pub fn new(entries: Vec<ResourceGroupEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ResourceGroupEntry] {
        &self.entries
    }

    fn matching<'a>(
        &'a self,
        organism: &'a str,
        assembly: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ResourceGroupEntry> + 'a {
        self.entries.iter().filter(move |entry| {
            entry.organism == organism && assembly.map_or(true, |a| entry.assembly == a)
        })
    }

    /// Groups of one assembly, or of every assembly of the organism.
    pub fn groups_for(&self, organism: &str, assembly: Option<&str>) -> BTreeSet<String> {
        self.matching(organism, assembly)
            .flat_map(|entry| entry.groups.iter().cloned())
            .collect()
    }

    /// With an assembly: that assembly is public. Without: any assembly of
    /// the organism is public.
    pub fn is_public(&self, organism: &str, assembly: Option<&str>) -> bool {
        self.matching(organism, assembly).any(ResourceGroupEntry::is_public)
    }

    pub fn organisms_in_group(&self, group: &str) -> BTreeSet<String> {
        let group = canonical_group(group);
        self.entries
            .iter()
            .filter(|entry| entry.groups.contains(&group))
            .map(|entry| entry.organism.clone())
            .collect()
    }

    /// True when the group holds at least one public assembly.
    pub fn is_public_group(&self, group: &str) -> bool {
        let group = canonical_group(group);
        self.entries
            .iter()
            .any(|entry| entry.groups.contains(&group) && entry.is_public())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

fn stamp(path: &Path) -> Option<FileStamp> {
    let meta = fs::metadata(path).ok()?;
    Some(FileStamp {
        modified: meta.modified().ok()?,
        len: meta.len(),
    })
}

/// Group file reader with an mtime/length keyed cache.
pub struct ResourceGroupIndex {
    path: PathBuf,
    cache: RwLock<Option<(FileStamp, Arc<GroupSnapshot>)>>,
}

impl ResourceGroupIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, re-read when the file changed since the last call.
    pub fn snapshot(&self) -> Arc<GroupSnapshot> {
        let Some(current) = stamp(&self.path) else {
            tracing::warn!("Resource group file {} not found, no groups are public", self.path.display());
            *self.cache.write() = None;
            return Arc::new(GroupSnapshot::default());
        };

        if let Some((cached, snapshot)) = self.cache.read().as_ref() {
            if *cached == current {
                return Arc::clone(snapshot);
            }
        }

        match try_load(&self.path) {
            Ok(entries) => {
                let snapshot = Arc::new(GroupSnapshot::new(entries));
                *self.cache.write() = Some((current, Arc::clone(&snapshot)));
                tracing::debug!("Loaded {} resource group entries", snapshot.entries().len());
                snapshot
            }
            Err(e) => {
                // Likely a concurrent writer; retry on the next call
                tracing::warn!("Resource group file {} unreadable, treating as empty: {}", self.path.display(), e);
                *self.cache.write() = None;
                Arc::new(GroupSnapshot::default())
            }
        }
    }

    pub fn groups_for(&self, organism: &str, assembly: Option<&str>) -> BTreeSet<String> {
        self.snapshot().groups_for(organism, assembly)
    }

    pub fn is_public(&self, organism: &str, assembly: Option<&str>) -> bool {
        self.snapshot().is_public(organism, assembly)
    }

    pub fn organisms_in_group(&self, group: &str) -> BTreeSet<String> {
        self.snapshot().organisms_in_group(group)
    }
}
