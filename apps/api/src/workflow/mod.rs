// Upload/analysis wizard: step machine, file validation and the reload snapshot.
// The submission endpoint drives the same machine so server and client guards agree.

#![allow(dead_code)]

pub mod file_ref;
pub mod machine;
pub mod persist;
pub mod validation;

pub use file_ref::FileRef;
pub use machine::{JobInput, JobInputMethod, PasteTarget, Step, Submission, WorkflowError, WorkflowState};
pub use persist::{PersistError, PersistedFile, PersistedWorkflow, PENDING_ANALYSIS_KEY};
pub use validation::FileRejection;
