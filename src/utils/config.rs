//! Configuration and constants for the reconciliation engine.

use std::time::Duration;

/// Default timeout for upstream requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Current output schema version of the circulation report
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Schema version of the persisted fallback snapshot.
/// Stored envelopes with any other version are treated as absent.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

// Fixed-point scaling exponents.
// Native coin balances come in nanos (1e9), DAO / project tokens as
// uint256 base units (1e18).
pub const NATIVE_DECIMALS: u32 = 9;
pub const DAO_TOKEN_DECIMALS: u32 = 18;

/// Ticker of the native coin
pub const NATIVE_SYMBOL: &str = "DESO";

/// Display budget for ranked collections
pub const DEFAULT_TOP_N: usize = 15;

// Fan-out and retry policy
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 250;

// Holder-list pagination
pub const DEFAULT_PAGE_SIZE: usize = 500;
pub const MIN_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

// Upstream endpoints (relative to the node API base URL)
pub const PROFILE_PATH: &str = "/api/v0/get-single-profile";
pub const USERS_PATH: &str = "/api/v0/get-users-stateless";
pub const HOLDERS_PATH: &str = "/api/v0/get-hodlers-for-public-key";
pub const VALIDATORS_PATH: &str = "/api/v0/validators";
pub const STAKE_ENTRIES_PATH: &str = "/api/v0/stake-entries";
pub const TOTAL_SUPPLY_PATH: &str = "/api/v0/total-supply";
pub const EXCHANGE_RATE_PATH: &str = "/api/v0/get-exchange-rate";

// Tree labels
pub const LABEL_TOTAL_SUPPLY: &str = "Total Supply";
pub const LABEL_STAKED: &str = "Staked";
pub const LABEL_NOT_STAKED: &str = "Not Staked";
pub const LABEL_CORE_VALIDATORS: &str = "Core Validators";
pub const LABEL_COMMUNITY_VALIDATORS: &str = "Community Validators";
pub const LABEL_FREE_FLOAT: &str = "Free Float";
pub const LABEL_OTHERS: &str = "Others";
pub const LABEL_OTHER_NAMED: &str = "Other (named)";
pub const LABEL_UNNAMED: &str = "Unnamed";
pub const LABEL_UNATTRIBUTED: &str = "Unattributed";
pub const LABEL_CCV1_LOCKED: &str = "CCv1 Locked";
pub const LABEL_PROJECT_TOKENS: &str = "Project Tokens";
pub const LABEL_WRAPPED_ASSETS: &str = "Wrapped Assets";

/// Relative tolerance used when checking that a node equals the sum of its children
pub const CONSERVATION_TOLERANCE: f64 = 1e-6;
