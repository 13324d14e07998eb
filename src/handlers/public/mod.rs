// handlers/public/mod.rs - Public handlers (no access check)
//
// The identity is still resolved by the session gateway, so these handlers
// can report it, but they never deny.

pub mod index;
pub mod session;
