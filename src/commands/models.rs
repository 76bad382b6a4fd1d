use std::path::PathBuf;

/// Default DeSo node API
pub const DEFAULT_API_URL: &str = "https://node.deso.org";

/// Default GraphQL indexer endpoint
pub const DEFAULT_GRAPHQL_URL: &str = "https://graphql-prod.deso.com/graphql";

/// Arguments for the report command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, PartialEq)]
pub struct ReportArgs {
    /// Roster TOML file
    pub roster: PathBuf,

    /// Node API base URL
    pub api_url: String,

    /// GraphQL indexer URL
    pub graphql_url: String,

    /// Persistent fallback snapshot
    pub cache: PathBuf,

    /// Output path for the JSON report
    pub output: PathBuf,

    /// Overrides the roster's Top-N
    pub top_n: Option<usize>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            roster: PathBuf::from("roster.toml"),
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            cache: PathBuf::from("circulation-cache.json"),
            output: PathBuf::from("circulation.json"),
            top_n: None,
            print_summary: false,
        }
    }
}

/// Arguments for the watch command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, PartialEq)]
pub struct WatchArgs {
    /// Endpoints, roster, cache and output shared with `report`
    pub report: ReportArgs,

    /// Seconds between polling cycles
    pub interval_secs: u64,

    /// Seconds between price refreshes
    pub price_interval_secs: u64,

    /// Stop after this many cycles
    pub max_cycles: Option<usize>,
}

impl Default for WatchArgs {
    fn default() -> Self {
        Self {
            report: ReportArgs::default(),
            interval_secs: 300,
            price_interval_secs: 60,
            max_cycles: None,
        }
    }
}
