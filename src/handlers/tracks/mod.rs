// handlers/tracks/mod.rs - Token-gated track file server
//
// Runs without the session gateway: the only credentials it accepts are a
// signed track token or, per whitelist mode, a trusted network address.

pub mod files;
