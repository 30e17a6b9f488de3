//! Hub authentication token resolution.
//!
//! Gated and private repositories need a bearer token. Resolution order:
//! the `HF_TOKEN` environment variable, then the Hub CLI's cached token
//! file. Absence is not an error — public repositories need none.

const HF_TOKEN_ENV_VAR: &str = "HF_TOKEN";

/// Resolve a Hub token from the environment or the CLI cache file.
pub fn resolve_token() -> Option<String> {
    if let Ok(token) = std::env::var(HF_TOKEN_ENV_VAR) {
        if let Some(token) = non_empty(token) {
            return Some(token);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let cache_token = home.join(".cache").join("huggingface").join("token");
        if let Ok(token) = std::fs::read_to_string(cache_token) {
            return non_empty(token);
        }
    }

    None
}

fn non_empty(token: String) -> Option<String> {
    let token = token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
