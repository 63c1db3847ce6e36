//! Default configuration values

/// Default request timeout in seconds
pub const fn default_timeout() -> u64 {
    30
}

/// Default connect timeout in seconds
pub const fn default_connect_timeout() -> u64 {
    10
}

/// Default `User-Agent` header
pub fn default_user_agent() -> String {
    format!("gbuf/{}", env!("CARGO_PKG_VERSION"))
}

/// Content type forced onto every encoded request body
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Name of the config directory under the XDG config home
pub const CONFIG_DIR_NAME: &str = "gbuf";

/// Name of the config file inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";
