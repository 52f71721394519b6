// src/config/consts.rs

// Remote API
pub const API_BASE_URL: &str = "https://app.sycamoreschool.com/api/v1";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("sis_roster/", env!("CARGO_PKG_VERSION"));
pub const TOKEN_ENV: &str = "SIS_TOKEN";

// Local cache
pub const STORE_DIR: &str = ".store";
pub const STORE_EXT: &str = "json";

// Fetch policy
pub const DEFAULT_RETRIES: u32 = 0;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 8;

// Export
pub const DEFAULT_OUT_DIR: &str = "out";

// Dates
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
pub const US_DATE_FORMAT: &str = "%m/%d/%Y";

// Derivation defaults
pub const STUDENT_DOMAIN: &str = "@student.example.org";
pub const STAFF_DOMAIN: &str = "@example.org";
pub const MAX_FAMILY_EMAILS: usize = 3;
pub const MAX_PRIMARY_PARENTS: usize = 2;
