//! Per-request JBrowse2 configs, filtered to what the identity may see.

use serde_json::{json, Value};

use super::metadata::{
    parse_assembly_name, AssemblyDefinition, MetadataError, MetadataStore, TrackDefinition, SYNTENY_DIR,
};
use super::uri::UriRewriter;
use crate::access::{policy, GroupSnapshot, Identity};
use crate::auth::TrackTokenService;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("access denied")]
    AccessDenied,
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::AccessDenied => ApiError::forbidden("Access denied"),
            ConfigError::Metadata(MetadataError::InvalidName(_)) => ApiError::bad_request("Invalid organism or assembly"),
            ConfigError::Metadata(MetadataError::InvalidAssemblyName(_)) => {
                ApiError::bad_request("Invalid assembly name format. Use: Organism_Assembly")
            }
            ConfigError::Metadata(MetadataError::AssemblyNotFound(name)) => {
                ApiError::not_found(format!("Assembly definition not found: {}", name))
            }
            ConfigError::Metadata(err @ MetadataError::MissingDirectory(_))
            | ConfigError::Metadata(err @ MetadataError::InvalidDefinition { .. }) => {
                tracing::error!("JBrowse2 metadata: {}", err);
                ApiError::internal_server_error("Assembly metadata unavailable")
            }
        }
    }
}

pub struct ConfigBuilder<'a> {
    pub store: &'a MetadataStore,
    pub tokens: &'a TrackTokenService,
    pub rewriter: &'a UriRewriter,
    pub identity: &'a Identity,
    pub groups: &'a GroupSnapshot,
}

impl<'a> ConfigBuilder<'a> {
    /// Assemblies the identity may open, no tracks.
    pub fn assembly_list(&self) -> Result<Value, ConfigError> {
        let assemblies: Vec<Value> = self
            .store
            .list_assemblies()?
            .into_iter()
            .filter(|def| {
                policy::can_access_assembly_level(
                    self.identity,
                    def.declared_level(),
                    def.organism.as_deref().unwrap_or(""),
                    def.assembly_id.as_deref().unwrap_or(""),
                )
            })
            .map(|def| {
                json!({
                    "name": def.name,
                    "displayName": def.display_name.clone().unwrap_or_else(|| def.name.clone()),
                    "aliases": def.aliases,
                    "accessLevel": def.declared_level(),
                    "sequence": def.sequence,
                })
            })
            .collect();

        Ok(json!({
            "assemblies": assemblies,
            "plugins": [],
            "configuration": {},
            "connections": [],
            "defaultSession": {"name": "New Session"},
            "tracks": [],
            "userAccessLevel": self.identity.tier,
        }))
    }

    /// One assembly with its visible tracks embedded.
    pub fn assembly_config(&self, organism: &str, assembly: &str) -> Result<Value, ConfigError> {
        if !policy::has_assembly_access(self.identity, self.groups, organism, assembly) {
            return Err(ConfigError::AccessDenied);
        }

        let def = self.store.load_assembly(organism, assembly)?;
        let tracks = self.filtered_tracks(organism, assembly)?;

        Ok(json!({
            "assemblies": [assembly_entry(&def, organism, assembly)],
            "plugins": [],
            "configuration": {},
            "tracks": tracks,
            "defaultSession": {
                "name": format!("{} {}", organism, assembly),
                "view": {"id": "linearGenomeView", "type": "LinearGenomeView", "tracks": []}
            },
        }))
    }

    /// Two assemblies side by side with the synteny tracks joining them.
    /// Names are `Organism_Assembly`.
    pub fn dual_config(&self, first: &str, second: &str) -> Result<Value, ConfigError> {
        let (org1, asm1) =
            parse_assembly_name(first).ok_or_else(|| MetadataError::InvalidAssemblyName(first.to_string()))?;
        let (org2, asm2) =
            parse_assembly_name(second).ok_or_else(|| MetadataError::InvalidAssemblyName(second.to_string()))?;

        let def1 = self.load_gated(&org1, &asm1)?;
        let def2 = self.load_gated(&org2, &asm2)?;

        for (def, org, asm) in [(&def1, &org1, &asm1), (&def2, &org2, &asm2)] {
            if !policy::can_access_assembly_level(self.identity, def.declared_level(), org, asm) {
                return Err(ConfigError::AccessDenied);
            }
        }

        let mut tracks = self.filtered_tracks(&org1, &asm1)?;
        tracks.extend(self.filtered_tracks(&org2, &asm2)?);
        tracks.extend(self.synteny_tracks(
            first,
            second,
            (org1.as_str(), asm1.as_str()),
            (org2.as_str(), asm2.as_str()),
        )?);

        Ok(json!({
            "assemblies": [assembly_entry(&def1, &org1, &asm1), assembly_entry(&def2, &org2, &asm2)],
            "plugins": [],
            "configuration": {},
            "tracks": tracks,
            "defaultSession": {
                "name": format!("{} vs {} Comparison", first, second),
                "views": [{
                    "type": "LinearSyntenyView",
                    "views": [
                        {"type": "LinearGenomeView", "assemblyNames": [def1.name], "tracks": []},
                        {"type": "LinearGenomeView", "assemblyNames": [def2.name], "tracks": []}
                    ],
                    "tracks": []
                }]
            },
        }))
    }

    /// A missing definition looks like a private one unless the identity
    /// could open it anyway.
    fn load_gated(&self, organism: &str, assembly: &str) -> Result<AssemblyDefinition, ConfigError> {
        match self.store.load_assembly(organism, assembly) {
            Err(MetadataError::AssemblyNotFound(_)) if !self.identity.tier.bypasses_grants() => {
                Err(ConfigError::AccessDenied)
            }
            other => other.map_err(ConfigError::from),
        }
    }

    fn filtered_tracks(&self, organism: &str, assembly: &str) -> Result<Vec<Value>, ConfigError> {
        let visible: Vec<TrackDefinition> = self
            .store
            .load_tracks(organism, assembly)?
            .into_iter()
            .filter(|track| policy::can_view_track(self.identity, track.declared_level(), organism, assembly))
            .collect();

        Ok(self.with_tokens(visible, organism, assembly))
    }

    fn synteny_tracks(
        &self,
        first: &str,
        second: &str,
        side1: (&str, &str),
        side2: (&str, &str),
    ) -> Result<Vec<Value>, ConfigError> {
        let mut tracks = Vec::new();
        for (pair_dir, track) in self.store.load_synteny_tracks(first, second)? {
            if !policy::can_view_synteny_track(self.identity, self.groups, track.declared_level(), side1, side2) {
                continue;
            }
            // Synteny files live at synteny/<pair>/..., so that is the token scope
            tracks.extend(self.with_tokens(vec![track], SYNTENY_DIR, &pair_dir));
        }
        Ok(tracks)
    }

    /// Tracks whose token cannot be minted are dropped.
    fn with_tokens(&self, tracks: Vec<TrackDefinition>, organism: &str, assembly: &str) -> Vec<Value> {
        if tracks.is_empty() {
            return Vec::new();
        }

        let token = match self.tokens.issue_token(organism, assembly) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Failed to generate track token for {}/{}: {}", organism, assembly, e);
                return Vec::new();
            }
        };

        tracks
            .into_iter()
            .map(|mut track| {
                let level = track.declared_level();
                if let Some(adapter) = track.adapter_mut() {
                    self.rewriter.add_token_to_adapter_urls(adapter, &token, level);
                }
                track.into_value()
            })
            .collect()
    }
}

fn assembly_entry(def: &AssemblyDefinition, organism: &str, assembly: &str) -> Value {
    json!({
        "name": def.name,
        "displayName": def.display_name.clone().unwrap_or_else(|| format!("{} ({})", organism, assembly)),
        "aliases": if def.aliases.is_empty() { vec![assembly.to_string()] } else { def.aliases.clone() },
        "sequence": def.sequence,
    })
}
