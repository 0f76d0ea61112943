//! Span attribute names.
//!
//! Generation calls follow the OpenTelemetry GenAI semantic conventions;
//! workflow spans use the `herald.*` namespace. Pass these to
//! `Span::record` for fields declared `Empty` when the span was opened.

// --- GenAI ---

/// The operation being performed (e.g. "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// Why the model stopped generating (e.g. "stop", "length").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// Chat completion operation.
pub const OP_CHAT: &str = "chat";

// --- Workflow ---

/// Thread id of the workflow run.
pub const HERALD_THREAD_ID: &str = "herald.thread_id";

/// Status the run ended the call in.
pub const HERALD_STATUS: &str = "herald.status";

/// Which completion of a generation ("email" or "chat").
pub const HERALD_COMPLETION: &str = "herald.completion";
