// handlers/protected/mod.rs - Pages and APIs gated by the access policy
//
// Page handlers redirect to the access-denied URL on denial; JSON APIs
// answer 403. Neither names the resource that was refused.

pub mod groups;
pub mod jbrowse;
pub mod organisms;
