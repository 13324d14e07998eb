//! JBrowse2 integration: config generation with token injection, and the
//! helpers behind the token-gated track file server.

pub mod config;
pub mod files;
pub mod metadata;
pub mod uri;

pub use config::{ConfigBuilder, ConfigError};
pub use metadata::{parse_assembly_name, AssemblyDefinition, MetadataError, MetadataStore, TrackDefinition};
pub use uri::UriRewriter;
