//! Helpers for the host's conversation identifiers ("JIDs").
//!
//! A personal conversation is addressed as `<digits>@c.us` or
//! `<digits>@s.whatsapp.net`; masked business/linked identities carry an
//! `@lid_` marker and never encode a phone number.

pub const LID_MARKER: &str = "@lid_";
pub const JID_DOMAINS: [&str; 2] = ["@c.us", "@s.whatsapp.net"];
pub const MIN_JID_DIGITS: usize = 6;

pub fn is_masked_jid(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains(LID_MARKER)
}

/// Digit run that starts a JID segment (string start or after `_`) and is
/// followed by a JID domain or the end of the value.
pub fn jid_phone_digits(raw: &str) -> Option<&str> {
    digit_run(raw, true, &JID_DOMAINS)
}

/// Like [`jid_phone_digits`] without the segment anchor; used for URL
/// query values.
pub fn loose_jid_digits(raw: &str) -> Option<&str> {
    digit_run(raw, false, &JID_DOMAINS)
}

/// Digit run followed by `@` or the end of a URL path.
pub fn path_digits(raw: &str) -> Option<&str> {
    digit_run(raw, false, &["@"])
}

fn digit_run<'a>(raw: &'a str, segment_start: bool, terminators: &[&str]) -> Option<&'a str> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start < MIN_JID_DIGITS {
            continue;
        }
        if segment_start && start > 0 && bytes[start - 1] != b'_' {
            continue;
        }
        let rest = &raw[i..];
        if rest.is_empty() || terminators.iter().any(|t| rest.starts_with(t)) {
            return Some(&raw[start..i]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{is_masked_jid, jid_phone_digits, loose_jid_digits, path_digits};

    #[test]
    fn masked_marker_is_case_insensitive() {
        assert!(is_masked_jid("false_123456@lid_abc"));
        assert!(is_masked_jid("x@LID_1"));
        assert!(!is_masked_jid("8801722626327@c.us"));
    }

    #[test]
    fn jid_digits_follow_message_id_layout() {
        assert_eq!(
            jid_phone_digits("true_8801722626327@c.us_3EB0A1"),
            Some("8801722626327")
        );
        assert_eq!(
            jid_phone_digits("8801722626327@s.whatsapp.net"),
            Some("8801722626327")
        );
        assert_eq!(jid_phone_digits("8801722626327"), Some("8801722626327"));
    }

    #[test]
    fn jid_digits_require_anchor_and_domain() {
        assert_eq!(jid_phone_digits("abc8801722626327@c.us"), None);
        assert_eq!(jid_phone_digits("8801722626327@g.us"), None);
        assert_eq!(jid_phone_digits("12345@c.us"), None);
        assert_eq!(loose_jid_digits("abc8801722626327@c.us"), Some("8801722626327"));
    }

    #[test]
    fn path_digits_stop_at_at_sign_or_end() {
        assert_eq!(path_digits("/send/8801722626327"), Some("8801722626327"));
        assert_eq!(path_digits("/8801722626327@s.whatsapp.net"), Some("8801722626327"));
        assert_eq!(path_digits("/8801722626327/chat"), None);
    }
}
