// Anonymous ratings on finished analyses, one per analysis, plus the admin review queue.

pub mod handlers;
pub mod store;
