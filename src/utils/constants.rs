//! Shared constants and invariants

pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CONFIG_PATH: &str = "event-console.yaml";

pub const TOKEN_EXCHANGE_FAILURE_MSG: &str = "Failed to generate access token";

// Request surfaces
pub const REQUEST_TYPE_INTERACT: &str = "interact";
pub const REQUEST_TYPE_COLLECTION: &str = "collection";

// Platform header names
pub const HEADER_ORG_ID: &str = "x-gw-ims-org-id";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_SANDBOX_NAME: &str = "x-sandbox-name";
pub const HEADER_FLOW_ID: &str = "x-adobe-flow-id";
