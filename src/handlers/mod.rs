// handlers/mod.rs - Handlers grouped by how a request earns access
//
// Public    (no check)                  → /, /health, /login, /logout, /access_denied, /api/auth/whoami
// Protected (identity + policy check)   → /organisms/*, /groups/*, /api/jbrowse2/config
// Elevated  (explicit ADMIN login only) → /admin/api/*
// Tracks    (signed track token only)   → /api/jbrowse2/tracks
//
// Everything except Tracks sits behind the session gateway middleware, which
// puts the request Identity into the extensions.

pub mod elevated;
pub mod protected;
pub mod public;
pub mod tracks;
