// handlers/elevated/mod.rs - Admin surface
//
// Only an explicit ADMIN login gets here. IP_IN_RANGE users see every
// resource but are not site administrators.

pub mod access;
