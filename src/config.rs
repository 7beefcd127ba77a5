//! Default settings for similtext.
//!
//! Runtime values come from command line arguments or their environment
//! variables (see the binary's `--help`); these are the fallbacks.

/// Address the HTTP server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the HTTP server listens on.
pub const DEFAULT_PORT: u16 = 5050;

/// Directory holding the three index blobs.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Number of results `search` returns when not told otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "similtext=info";

/// Largest JSON request body the HTTP server accepts, in bytes.
/// `/init` carries the whole corpus, so this is well above actix's default.
pub const MAX_JSON_PAYLOAD: usize = 64 * 1024 * 1024;
