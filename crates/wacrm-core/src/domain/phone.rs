use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Shortest digit run ever surfaced as an identifier.
pub const MIN_DIGITS: usize = 8;

pub fn only_digits(text: &str) -> String {
    text.chars().filter(|ch| ch.is_ascii_digit()).collect()
}

pub fn has_min_length(text: &str, min: usize) -> bool {
    text.chars().filter(|ch| ch.is_ascii_digit()).count() >= min
}

/// National mobile numbering rules.
///
/// A local number is `trunk_prefix + mobile_prefix + operator digit +
/// subscriber digits`; the international form swaps the trunk prefix for
/// the country code. The default plan is Bangladesh: `01[3-9]` followed by
/// eight digits locally, `8801[3-9]` followed by eight digits with the
/// country code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPlan {
    country_code: String,
    trunk_prefix: String,
    mobile_prefix: String,
    operator_digits: String,
    subscriber_len: usize,
}

impl Default for NumberPlan {
    fn default() -> Self {
        Self {
            country_code: "880".to_string(),
            trunk_prefix: "0".to_string(),
            mobile_prefix: "1".to_string(),
            operator_digits: "3456789".to_string(),
            subscriber_len: 8,
        }
    }
}

impl NumberPlan {
    pub fn new(
        country_code: &str,
        trunk_prefix: &str,
        mobile_prefix: &str,
        operator_digits: &str,
        subscriber_len: usize,
    ) -> Result<Self, CoreError> {
        for (field, value) in [
            ("country_code", country_code),
            ("trunk_prefix", trunk_prefix),
            ("mobile_prefix", mobile_prefix),
            ("operator_digits", operator_digits),
        ] {
            let value = value.trim();
            if value.is_empty() || !value.chars().all(|ch| ch.is_ascii_digit()) {
                return Err(CoreError::InvalidNumberPlan(format!(
                    "{field} must be a non-empty digit string"
                )));
            }
        }
        if country_code.trim().starts_with(trunk_prefix.trim()) {
            return Err(CoreError::InvalidNumberPlan(
                "country_code must not start with the trunk prefix".to_string(),
            ));
        }
        if subscriber_len == 0 {
            return Err(CoreError::InvalidNumberPlan(
                "subscriber_len must be positive".to_string(),
            ));
        }

        Ok(Self {
            country_code: country_code.trim().to_string(),
            trunk_prefix: trunk_prefix.trim().to_string(),
            mobile_prefix: mobile_prefix.trim().to_string(),
            operator_digits: operator_digits.trim().to_string(),
            subscriber_len,
        })
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn trunk_prefix(&self) -> &str {
        &self.trunk_prefix
    }

    pub fn mobile_prefix(&self) -> &str {
        &self.mobile_prefix
    }

    pub fn operator_digits(&self) -> &str {
        &self.operator_digits
    }

    pub fn subscriber_len(&self) -> usize {
        self.subscriber_len
    }

    fn national_len(&self) -> usize {
        self.mobile_prefix.len() + 1 + self.subscriber_len
    }

    pub fn local_len(&self) -> usize {
        self.trunk_prefix.len() + self.national_len()
    }

    pub fn international_len(&self) -> usize {
        self.country_code.len() + self.national_len()
    }

    // `mobile_prefix`, one operator digit, then subscriber digits.
    fn is_national_tail(&self, tail: &str) -> bool {
        if tail.len() != self.national_len() {
            return false;
        }
        let Some(rest) = tail.strip_prefix(self.mobile_prefix.as_str()) else {
            return false;
        };
        let mut chars = rest.chars();
        match chars.next() {
            Some(op) if self.operator_digits.contains(op) => {}
            _ => return false,
        }
        chars.all(|ch| ch.is_ascii_digit())
    }

    pub fn is_valid_local_mobile(&self, digits: &str) -> bool {
        if !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return false;
        }
        if digits.len() == self.local_len() {
            if let Some(tail) = digits.strip_prefix(self.trunk_prefix.as_str()) {
                if self.is_national_tail(tail) {
                    return true;
                }
            }
        }
        if digits.len() == self.international_len() {
            if let Some(tail) = digits.strip_prefix(self.country_code.as_str()) {
                return self.is_national_tail(tail);
            }
        }
        false
    }

    /// Rewrites a number into local dialing form: the country code becomes
    /// the trunk prefix, trunk-prefixed input passes through, anything else
    /// gets the trunk prefix prepended.
    pub fn to_local_format(&self, digits: &str) -> String {
        let digits = only_digits(digits);
        if let Some(rest) = digits.strip_prefix(self.country_code.as_str()) {
            return format!("{}{}", self.trunk_prefix, rest);
        }
        if digits.starts_with(self.trunk_prefix.as_str()) {
            return digits;
        }
        format!("{}{}", self.trunk_prefix, digits)
    }

    /// Local form accepted by outbound notification calls.
    pub fn broadcast_number(&self, digits: &str) -> Result<String, CoreError> {
        let local = self.to_local_format(digits);
        if local.len() == self.local_len() && self.is_valid_local_mobile(&local) {
            Ok(local)
        } else {
            Err(CoreError::InvalidMobileNumber(digits.to_string()))
        }
    }

    /// Every mobile number embedded in `text`, in order of first occurrence.
    ///
    /// Works on the digit-only projection, so separators between digit
    /// groups are irrelevant. Matches are taken leftmost first and do not
    /// overlap: the local tail inside a country-code number is not reported
    /// a second time.
    pub fn find_mobiles(&self, text: &str) -> Vec<String> {
        let digits = only_digits(text);
        let intl_len = self.international_len();
        let local_len = self.local_len();

        let mut out: Vec<String> = Vec::new();
        let mut i = 0;
        while i < digits.len() {
            let rest = &digits[i..];
            let matched = if rest.len() >= intl_len
                && rest.starts_with(self.country_code.as_str())
                && self.is_valid_local_mobile(&rest[..intl_len])
            {
                Some(intl_len)
            } else if rest.len() >= local_len
                && rest.starts_with(self.trunk_prefix.as_str())
                && self.is_valid_local_mobile(&rest[..local_len])
            {
                Some(local_len)
            } else {
                None
            };

            match matched {
                Some(len) => {
                    let found = &rest[..len];
                    if !out.iter().any(|seen| seen == found) {
                        out.push(found.to_string());
                    }
                    i += len;
                }
                None => i += 1,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{has_min_length, only_digits, NumberPlan};

    #[test]
    fn only_digits_strips_formatting() {
        assert_eq!(only_digits("+880 1722-626327"), "8801722626327");
        assert_eq!(only_digits("(017) 22 626 327"), "01722626327");
        assert_eq!(only_digits(""), "");
        assert_eq!(only_digits("no digits"), "");
    }

    #[test]
    fn only_digits_is_idempotent() {
        for raw in ["+1 (415) 555-1212", "abc", "", "8801722626327", "٣٤ 12"] {
            let once = only_digits(raw);
            assert_eq!(only_digits(&once), once);
        }
    }

    #[test]
    fn has_min_length_counts_digits_only() {
        assert!(has_min_length("+880 17226", 8));
        assert!(!has_min_length("12-34-56", 8));
        assert!(has_min_length("12345678", 8));
    }

    #[test]
    fn valid_local_mobile_accepts_both_forms() {
        let plan = NumberPlan::default();
        assert!(plan.is_valid_local_mobile("01722626327"));
        assert!(plan.is_valid_local_mobile("8801722626327"));
        assert!(plan.is_valid_local_mobile("01311111111"));
    }

    #[test]
    fn valid_local_mobile_rejects_wrong_shapes() {
        let plan = NumberPlan::default();
        assert!(!plan.is_valid_local_mobile("01222626327"));
        assert!(!plan.is_valid_local_mobile("0172262632"));
        assert!(!plan.is_valid_local_mobile("017226263270"));
        assert!(!plan.is_valid_local_mobile("8801222626327"));
        assert!(!plan.is_valid_local_mobile("+8801722626327"));
        assert!(!plan.is_valid_local_mobile("4155551212"));
    }

    #[test]
    fn to_local_format_replaces_country_code() {
        let plan = NumberPlan::default();
        let local = plan.to_local_format("8801722626327");
        assert_eq!(local, "01722626327");
        assert_eq!(local.len(), plan.local_len());
        assert!(local.starts_with('0') && !local.starts_with("00"));
    }

    #[test]
    fn to_local_format_passes_or_prefixes() {
        let plan = NumberPlan::default();
        assert_eq!(plan.to_local_format("01722626327"), "01722626327");
        assert_eq!(plan.to_local_format("1722626327"), "01722626327");
        assert_eq!(plan.to_local_format("+880 1722-626327"), "01722626327");
    }

    #[test]
    fn broadcast_number_validates_result() {
        let plan = NumberPlan::default();
        assert_eq!(
            plan.broadcast_number("8801722626327").expect("valid"),
            "01722626327"
        );
        assert!(plan.broadcast_number("12345").is_err());
        assert!(plan.broadcast_number("8801222626327").is_err());
    }

    #[test]
    fn find_mobiles_extracts_embedded_numbers() {
        let plan = NumberPlan::default();
        assert_eq!(
            plan.find_mobiles("Phone: +880 1722-626327 (mobile)"),
            vec!["8801722626327".to_string()]
        );
        assert_eq!(
            plan.find_mobiles("call me at 017-2262-6327 tonight"),
            vec!["01722626327".to_string()]
        );
        assert_eq!(
            plan.find_mobiles("ref 99 01722626327"),
            vec!["01722626327".to_string()]
        );
    }

    #[test]
    fn find_mobiles_collapses_duplicates_in_order() {
        let plan = NumberPlan::default();
        let found = plan.find_mobiles("01911111111 / 01722626327 / 01911111111");
        assert_eq!(
            found,
            vec!["01911111111".to_string(), "01722626327".to_string()]
        );
    }

    #[test]
    fn find_mobiles_ignores_non_mobile_digits() {
        let plan = NumberPlan::default();
        assert!(plan.find_mobiles("+1 415 555 1212").is_empty());
        assert!(plan.find_mobiles("").is_empty());
        assert!(plan.find_mobiles("0121234567").is_empty());
    }

    #[test]
    fn custom_plan_validates_fields() {
        assert!(NumberPlan::new("44", "0", "7", "123456789", 8).is_ok());
        assert!(NumberPlan::new("", "0", "7", "1", 8).is_err());
        assert!(NumberPlan::new("44", "0", "x", "1", 8).is_err());
        assert!(NumberPlan::new("04", "0", "7", "1", 8).is_err());
        assert!(NumberPlan::new("44", "0", "7", "1", 0).is_err());
    }

    #[test]
    fn custom_plan_scans_its_own_shape() {
        let plan = NumberPlan::new("44", "0", "7", "123456789", 8).expect("plan");
        assert!(plan.is_valid_local_mobile("07912345678"));
        assert!(plan.is_valid_local_mobile("447912345678"));
        assert_eq!(
            plan.find_mobiles("+44 7912 345678"),
            vec!["447912345678".to_string()]
        );
    }
}
