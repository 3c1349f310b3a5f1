//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_SPACE_ID: &str = "space_id";
pub const FIELD_ENTITY_KIND: &str = "entity_kind";
pub const FIELD_ENTITY_KEY: &str = "entity_key";

// Collection sizes
pub const FIELD_MUTATIONS: &str = "mutations";
pub const FIELD_COMPENSATIONS: &str = "compensations";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_COMPENSATE: &str = "compensate";
