//! Time and identity utilities

use chrono::Utc;

/// Current Unix timestamp in milliseconds
///
/// All TTL and expiry comparisons in the store use this clock, so expiry is
/// decided by the store process itself rather than by callers.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Get current user from git config or OS environment
///
/// Used to stamp `updatedBy` on document writes when the caller does not
/// supply an explicit identity.
pub fn current_user() -> String {
    use std::env;
    use std::process::Command;

    // 1. Try Git Config (preferred for project context)
    if let Ok(output) = Command::new("git").args(["config", "user.name"]).output() {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    // 2. Try OS Environment Variable
    env::var("USER") // Linux/Mac
        .or_else(|_| env::var("USERNAME")) // Windows
        .unwrap_or_else(|_| "anonymous".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
        // Sanity: later than 2020-01-01
        assert!(a > 1_577_836_800_000);
    }

    #[test]
    fn test_current_user_never_empty() {
        assert!(!current_user().is_empty());
    }
}
