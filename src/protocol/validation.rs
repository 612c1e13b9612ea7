//! `userName` validation against the configured [`ProtocolConfig`] rules.

use crate::config::ProtocolConfig;

/// Validates a `userName` carried by `race:join` or `matchmaking:join`
/// against `config`'s length and character rules.
pub fn validate_user_name_with_config(name: &str, config: &ProtocolConfig) -> Result<(), String> {
    if name.is_empty() {
        return Err("User name cannot be empty".to_string());
    }
    if name.len() > config.max_user_name_length {
        return Err(format!("User name too long (max {} characters)", config.max_user_name_length));
    }

    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("User name cannot be blank".to_string());
    }

    let rules = &config.user_name_validation;
    if !rules.allow_leading_trailing_whitespace && trimmed.len() != name.len() {
        return Err("User name cannot have leading or trailing whitespace".to_string());
    }

    for ch in name.chars() {
        if ch == ' ' {
            if rules.allow_spaces {
                continue;
            }
            return Err("User name cannot contain spaces".to_string());
        }

        if ch.is_whitespace() {
            return Err("User name cannot contain whitespace characters".to_string());
        }

        let is_alphanumeric = if rules.allow_unicode_alphanumeric {
            ch.is_alphanumeric()
        } else {
            ch.is_ascii_alphanumeric()
        };

        if is_alphanumeric || rules.is_allowed_symbol(ch) {
            continue;
        }

        return Err("User name contains invalid characters".to_string());
    }

    Ok(())
}
