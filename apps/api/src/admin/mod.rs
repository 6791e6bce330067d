// Admin API: key-authenticated, permission-gated access to stored analyses.

pub mod guard;
pub mod handlers;
pub mod permissions;
