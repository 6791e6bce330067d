// Resume analysis pipeline: submission, background run, status and result lookup.
// Engine answers go through `schema` so only the current report shape is stored.

pub mod export;
pub mod handlers;
pub mod id;
pub mod preview;
pub mod schema;
pub mod service;
pub mod status;
pub mod store;
