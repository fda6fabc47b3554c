/// Framework name, used in startup banners and default log targets.
pub const FRAMEWORK_NAME: &str = "weft";

/// Framework version reported at bootstrap.
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the built-in module that provides configuration, logging,
/// caching and scheduling to every other module. It is always wired first
/// and its lifecycle callbacks run before any other module's.
pub const BOILERPLATE_MODULE: &str = "boilerplate";

/// Config key carrying the single-file configuration override
/// (`--CONFIG <path>` on the command line).
pub const CONFIG_FILE_KEY: &str = "CONFIG";

/// CLI switch naming an alternate dotenv file.
pub const ENV_FILE_SWITCH: &str = "env-file";

/// Default dotenv path probed when no override is given.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Config key selecting the cache backend.
pub const CACHE_PROVIDER_KEY: &str = "CACHE_PROVIDER";

/// Config key for the default cache TTL in seconds.
pub const CACHE_TTL_KEY: &str = "CACHE_TTL";

/// Config key for the cache key namespace prefix.
pub const CACHE_PREFIX_KEY: &str = "CACHE_PREFIX";

/// Config key for the minimum log level.
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";
