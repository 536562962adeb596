//! Constants used throughout the dialysis core crate.

/// Collection holding patient documents.
pub const PATIENTS_COLLECTION: &str = "patients";

/// Collection holding dialysis session documents.
pub const SESSIONS_COLLECTION: &str = "sessions";

/// Collection holding sensor reading documents.
pub const READINGS_COLLECTION: &str = "readings";

/// Collection holding generated report documents.
pub const REPORTS_COLLECTION: &str = "reports";

/// Default HTTP port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

/// Default bind host when `HOST` is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default store location when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sled://./dialysis_data";

/// URL scheme accepted in front of a store path.
pub const DATABASE_URL_SCHEME: &str = "sled://";

/// Default static asset root when `STATIC_DIR` is unset.
pub const DEFAULT_STATIC_DIR: &str = "./public";

/// Number of readings returned when the caller gives no limit.
pub const DEFAULT_READING_LIMIT: usize = 100;
