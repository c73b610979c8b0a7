//! Credential cache display formatting

use chrono::{DateTime, Utc};

use crate::models::CredentialRecord;
use crate::storage::StorageHealth;

/// Format the cached credential without revealing any token material
pub fn format_auth_status(record: Option<&CredentialRecord>) -> String {
    let Some(record) = record else {
        return "No cached credentials.".to_string();
    };

    let state = if record.expired {
        "Expired"
    } else if record.token.is_some() {
        "Active"
    } else {
        "No access token"
    };

    let mut output = format!("Status:        {}\n", state);
    output.push_str(&format!(
        "Refresh token: {}\n",
        if record.refresh_token.is_some() { "present" } else { "none" }
    ));
    output.push_str(&format!("Expires:       {}", format_expiry(record.expires_at)));
    if !record.extra.is_empty() {
        let mut keys: Vec<&str> = record.extra.keys().map(String::as_str).collect();
        keys.sort_unstable();
        output.push_str(&format!("\nOther fields:  {}", keys.join(", ")));
    }
    output
}

fn format_expiry(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

/// Format a storage health check
pub fn format_storage_health(health: &StorageHealth) -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    let mut output = String::new();
    output.push_str(&format!("Storage directory: {}\n", yes_no(health.storage_dir)));
    output.push_str(&format!("Credential file:   {}\n", yes_no(health.auth_file)));
    output.push_str(&format!("Settings file:     {}\n", yes_no(health.config_file)));
    output.push_str(&format!(
        "Owner-only access: {}",
        yes_no(health.permissions)
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_no_credentials() {
        assert_eq!(format_auth_status(None), "No cached credentials.");
    }

    #[test]
    fn test_status_hides_tokens() {
        let mut record = CredentialRecord::new("secret-token")
            .with_refresh_token("secret-refresh")
            .with_expires_at(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap());
        record.extra.insert("userId".into(), json!("u-1"));

        let output = format_auth_status(Some(&record));
        assert!(output.contains("Active"));
        assert!(output.contains("2030-01-02 03:04:05 UTC"));
        assert!(output.contains("userId"));
        assert!(!output.contains("secret"));
        assert!(!output.contains("u-1"));
    }

    #[test]
    fn test_expired_status() {
        let mut record = CredentialRecord::new("t");
        record.mark_expired();
        assert!(format_auth_status(Some(&record)).contains("Expired"));
    }

    #[test]
    fn test_health() {
        let health = StorageHealth {
            storage_dir: true,
            auth_file: false,
            config_file: true,
            permissions: true,
        };
        let output = format_storage_health(&health);
        assert!(output.contains("Credential file:   no"));
        assert!(output.contains("Owner-only access: yes"));
    }
}
