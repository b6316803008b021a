use std::env;

pub const DATADIR_VAR: &str = "LNDASH_DATADIR";
pub const LOG_LEVEL_VAR: &str = "LNDASH_LOG_LEVEL";
pub const REQUEST_TIMEOUT_VAR: &str = "LNDASH_REQUEST_TIMEOUT";

pub fn lndash_datadir() -> Option<String> {
    env::var(DATADIR_VAR).ok()
}

pub fn lndash_log_level() -> Option<String> {
    env::var(LOG_LEVEL_VAR).ok()
}

/// Request timeout in seconds, unparsed
pub fn lndash_request_timeout() -> Option<String> {
    env::var(REQUEST_TIMEOUT_VAR).ok()
}

pub fn compare_env_var(key: &str, value: &str) -> bool {
    match env::var(key) {
        Ok(val) => val == value,
        Err(_) => false,
    }
}
