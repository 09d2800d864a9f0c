// =============================================================================
// Duet Backend Constants
// =============================================================================

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

// =============================================================================
// VALIDATION LIMITS
// =============================================================================

/// Maximum character length for shared-event content
pub const EVENT_CONTENT_CHAR_LIMIT: usize = 2000;
