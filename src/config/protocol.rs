//! Protocol configuration: user-name validation rules.

use super::defaults::{
    default_allow_leading_trailing_whitespace, default_allow_spaces_in_user_names,
    default_allow_unicode_user_names, default_allowed_user_name_symbols,
    default_max_user_name_length,
};
use serde::{Deserialize, Serialize};

/// Protocol-level configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Maximum length for `userName`.
    #[serde(default = "default_max_user_name_length")]
    pub max_user_name_length: usize,
    /// User name validation rules.
    #[serde(default)]
    pub user_name_validation: UserNameValidationConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_user_name_length: default_max_user_name_length(),
            user_name_validation: UserNameValidationConfig::default(),
        }
    }
}

/// User name validation configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UserNameValidationConfig {
    /// Allow non-ASCII letters/digits (Unicode alphanumerics).
    #[serde(default = "default_allow_unicode_user_names")]
    pub allow_unicode_alphanumeric: bool,
    /// Permit spaces between words.
    #[serde(default = "default_allow_spaces_in_user_names")]
    pub allow_spaces: bool,
    /// Permit leading or trailing whitespace.
    #[serde(default = "default_allow_leading_trailing_whitespace")]
    pub allow_leading_trailing_whitespace: bool,
    /// Symbol characters always allowed in addition to alphanumeric chars.
    #[serde(default = "default_allowed_user_name_symbols")]
    pub allowed_symbols: Vec<char>,
    /// Optional string of additional characters that should be accepted.
    #[serde(default)]
    pub additional_allowed_characters: Option<String>,
}

impl Default for UserNameValidationConfig {
    fn default() -> Self {
        Self {
            allow_unicode_alphanumeric: default_allow_unicode_user_names(),
            allow_spaces: default_allow_spaces_in_user_names(),
            allow_leading_trailing_whitespace: default_allow_leading_trailing_whitespace(),
            allowed_symbols: default_allowed_user_name_symbols(),
            additional_allowed_characters: None,
        }
    }
}

impl UserNameValidationConfig {
    pub fn is_allowed_symbol(&self, ch: char) -> bool {
        if self.allowed_symbols.contains(&ch) {
            return true;
        }
        if let Some(extra) = &self.additional_allowed_characters {
            return extra.chars().any(|extra_ch| extra_ch == ch);
        }
        false
    }
}
