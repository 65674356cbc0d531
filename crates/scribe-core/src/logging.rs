//! Field names emitted by scribe's structured log events.
//!
//! `tracing` macros take field names as literals, so call sites spell these
//! out; this module is the vocabulary they agree on.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, e.g. an orphaned upload that could not be removed |
//! | INFO  | Lifecycle events and completed writes (register, login, note created) |
//! | DEBUG | Decision points such as authorization outcomes |
//! | TRACE | Per-item iteration (individual uploads, collaborator rows) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "media"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "users", "notes", "sessions", "filesystem", "http"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create_note", "login", "upload", "discard"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Authenticated user UUID.
pub const USER_ID: &str = "user_id";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Session UUID.
pub const SESSION_ID: &str = "session_id";

/// Collaborator UUID being added or removed.
pub const COLLABORATOR_ID: &str = "collaborator_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows or results returned.
pub const RESULT_COUNT: &str = "result_count";

/// Number of files involved in an upload batch.
pub const FILE_COUNT: &str = "file_count";

/// Byte length of an uploaded object.
pub const BYTES: &str = "bytes";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of open connections right after the pool connects.
pub const POOL_SIZE: &str = "pool_size";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
