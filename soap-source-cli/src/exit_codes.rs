//! Process exit codes, stable for scripts and supervisors.

pub const SUCCESS: i32 = 0;
/// Settings, request files or a response document were rejected.
pub const VALIDATION_FAILED: i32 = 2;
/// The run started but records could not be delivered.
pub const RUN_FAILED: i32 = 3;
/// I/O or runtime failure unrelated to the input's validity.
pub const RUNTIME_ERROR: i32 = 4;
