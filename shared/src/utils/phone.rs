//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// E.164: leading +, country code 1-9, up to 15 digits total
static E164_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").unwrap());

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check if a phone number is a valid E.164 number
pub fn is_valid_e164(phone: &str) -> bool {
    let normalized = normalize_phone_number(phone);
    E164_REGEX.is_match(&normalized)
}

/// Mask a phone number for logging (e.g., +1555****4567)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 9 {
        format!(
            "{}****{}",
            &normalized[0..normalized.len() - 8],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("+1 (555) 123-4567"), "+15551234567");
        assert_eq!(normalize_phone_number("+44 20 7183 8750"), "+442071838750");
        assert_eq!(normalize_phone_number("555.123.4567"), "5551234567");
    }

    #[test]
    fn test_is_valid_e164() {
        assert!(is_valid_e164("+15551234567"));
        assert!(is_valid_e164("+442071838750"));
        assert!(is_valid_e164("+8613812345678"));
        assert!(!is_valid_e164("15551234567")); // Missing +
        assert!(!is_valid_e164("+05551234567")); // Invalid country code
        assert!(!is_valid_e164("")); // Empty
        assert!(!is_valid_e164("+1")); // Too short
        assert!(!is_valid_e164("+123456789012345678")); // Too long
    }

    #[test]
    fn test_mask_phone_number() {
        assert_eq!(mask_phone_number("+15551234567"), "+155****4567");
        assert_eq!(mask_phone_number("+8613812345678"), "+86138****5678");
        assert_eq!(mask_phone_number("12345"), "****");
    }
}
