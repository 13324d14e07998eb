pub mod access;
pub mod groups;
pub mod token;
pub mod user;
