//! Tiered resource access control: who is asking, and what they may see.

pub mod groups;
pub mod identity;
pub mod ip_range;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod tier;

pub use groups::{load_groups, GroupSnapshot, ResourceGroupEntry, ResourceGroupIndex, PUBLIC_GROUP};
pub use identity::{AccessGrant, Identity};
pub use ip_range::IpRange;
pub use report::AccessReport;
pub use resolver::{resolve_identity, Resolution};
pub use tier::AccessTier;
