pub const RESERVOIR_API_URL: &str = "https://api.reservoir.tools";
pub const RESERVOIR_ASK_EVENTS_PATH: &str = "/events/asks/v3";
pub const RESERVOIR_API_KEY_HEADER: &str = "x-api-key";

/// Largest page the asks endpoint will serve.
pub const MAX_PAGE_LIMIT: u32 = 1000;
pub const DEFAULT_PAGE_LIMIT: u32 = MAX_PAGE_LIMIT;

pub const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_CAPTURE_STREAM: &str = "reservoir_asks";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

pub const ACTIVITIES_TABLE: &str = "activities";
pub const NFT_PRICES_TABLE: &str = "nft_prices";
pub const CAPTURE_CURSORS_TABLE: &str = "capture_cursors";
