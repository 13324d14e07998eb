//! Credentials: signed track tokens, the trusted-network bypass, and the
//! user store consulted at login.

pub mod track_token;
pub mod users;
pub mod whitelist;

pub use track_token::{TokenError, TrackClaims, TrackScope, TrackTokenService};
pub use users::{UserRecord, UserStore, UserStoreError};
pub use whitelist::{TrustedNetworks, WhitelistMode};
