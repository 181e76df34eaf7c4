//! Env loading helpers.
//!
//! Keeps the fallback chains in one place so callers never repeat
//! `env::var(..).or_else(..)` sequences.

use std::env;
use std::path::Path;

/// Load `.env` from the current directory into the process environment.
/// Existing variables are never overwritten. Runs once per process.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        load_dotenv_from_dir(&dir);
    });
}

/// Load `<dir>/.env` (no-op when the file is missing). Returns the number of
/// variables that were set.
pub fn load_dotenv_from_dir(dir: &Path) -> usize {
    let content = match std::fs::read_to_string(dir.join(".env")) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    let mut applied = 0;
    for (key, value) in parse_dotenv(&content) {
        if env::var(&key).is_err() {
            set_env_var(&key, &value);
            applied += 1;
        }
    }
    applied
}

/// Parse `KEY=value` lines. Comments, blank lines and `export ` prefixes are
/// handled; surrounding quotes are stripped.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            out.push((key.to_string(), value.to_string()));
        }
    }
    out
}

/// Read from the primary key or the alias chain; empty values fall through
/// to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_optional(primary, aliases).unwrap_or_else(default)
}

/// Read from the primary key or the alias chain; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    std::iter::once(primary)
        .chain(aliases.iter().copied())
        .find_map(|k| env::var(k).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Boolean env: `0/false/no/off` are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match env_optional(primary, aliases) {
        Some(s) => !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

/// Unsigned integer env; unparsable values fall back to `default` with a warning.
pub fn env_u64(primary: &str, aliases: &[&str], default: u64) -> u64 {
    match env_optional(primary, aliases) {
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(key = primary, value = %s, "Ignoring non-numeric value, using default {}", default);
            default
        }),
        None => default,
    }
}

/// Float env; unparsable values are treated as unset.
pub fn env_f64(primary: &str, aliases: &[&str]) -> Option<f64> {
    env_optional(primary, aliases).and_then(|s| s.parse().ok())
}

// All process env writes go through here. Callers must do this before any
// worker thread is started.
pub fn set_env_var(key: &str, value: &str) {
    env::set_var(key, value);
}
