//! # Disconnect Cause Matching
//!
//! Decides whether a disconnect was triggered by the chat attestation
//! machinery. Hosts that expose a structured cause code are matched on
//! that; otherwise the human-readable reason is scanned.
//!
//! | Step | Input | Match |
//! |------|-------|-------|
//! | 1 | cause code | exact name, ASCII case-insensitive |
//! | 2 | reason text | [`REASON_PATTERNS`], first hit wins |
//!
//! A disconnect matching neither step is not an attestation failure.

use crate::error::Result;
use regex::RegexSet;
use std::fmt;

/// Reason fragments, most specific first.
pub const REASON_PATTERNS: &[(&str, &str)] = &[
    ("missing or invalid signature", r"(?i)missing\s+or\s+invalid\s+signature"),
    ("chat signature", r"(?i)chat\s+signature"),
    ("secure chat", r"(?i)secure\s+chat"),
    ("profile public key", r"(?i)profile\s+public\s+key"),
    ("signature", r"(?i)signature"),
];

/// A disconnect cause attributed to chat attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationFailure {
    /// Chat arrived with a timestamp older than the previous one.
    OutOfOrderChat,
    /// Too many messages awaiting acknowledgement.
    TooManyPendingChats,
    /// The profile key expired.
    ExpiredProfilePublicKey,
    /// Signature chain validation failed.
    ChatValidationFailed,
    /// Chat arrived without a signature.
    UnsignedChat,
    /// No cause code, but the reason text matched this pattern.
    Reason(&'static str),
}

impl AttestationFailure {
    /// Every structured cause code.
    pub const CODES: [Self; 5] = [
        Self::OutOfOrderChat,
        Self::TooManyPendingChats,
        Self::ExpiredProfilePublicKey,
        Self::ChatValidationFailed,
        Self::UnsignedChat,
    ];

    /// Parses a structured cause code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::CODES
            .into_iter()
            .find(|failure| failure.as_str().eq_ignore_ascii_case(code))
    }

    /// Cause code, or the matched reason fragment.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfOrderChat => "OUT_OF_ORDER_CHAT",
            Self::TooManyPendingChats => "TOO_MANY_PENDING_CHATS",
            Self::ExpiredProfilePublicKey => "EXPIRED_PROFILE_PUBLIC_KEY",
            Self::ChatValidationFailed => "CHAT_VALIDATION_FAILED",
            Self::UnsignedChat => "UNSIGNED_CHAT",
            Self::Reason(fragment) => *fragment,
        }
    }
}

impl fmt::Display for AttestationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled matcher for [`AttestationFailure`]s.
#[derive(Debug, Clone)]
pub struct CauseMatcher {
    reasons: RegexSet,
}

impl CauseMatcher {
    /// Compiles [`REASON_PATTERNS`].
    ///
    /// # Errors
    ///
    /// [`GuardError::Pattern`](crate::GuardError::Pattern) if a pattern is
    /// invalid.
    pub fn new() -> Result<Self> {
        let reasons = RegexSet::new(REASON_PATTERNS.iter().map(|(_, pattern)| *pattern))?;
        Ok(Self { reasons })
    }

    /// Attributes a disconnect, code first, reason text second.
    #[must_use]
    pub fn classify(&self, cause: Option<&str>, reason: &str) -> Option<AttestationFailure> {
        if let Some(failure) = cause.and_then(AttestationFailure::from_code) {
            return Some(failure);
        }
        self.reasons
            .matches(reason)
            .iter()
            .next()
            .map(|index| AttestationFailure::Reason(REASON_PATTERNS[index].0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_names() {
        for failure in AttestationFailure::CODES {
            assert_eq!(AttestationFailure::from_code(failure.as_str()), Some(failure));
        }
        assert_eq!(
            AttestationFailure::from_code("unsigned_chat"),
            Some(AttestationFailure::UnsignedChat)
        );
        assert_eq!(AttestationFailure::from_code("IDLING"), None);
    }

    #[test]
    fn test_code_wins_over_reason() {
        let matcher = CauseMatcher::new().unwrap();
        let failure = matcher.classify(Some("OUT_OF_ORDER_CHAT"), "secure chat problem");
        assert_eq!(failure, Some(AttestationFailure::OutOfOrderChat));
    }

    #[test]
    fn test_unknown_code_falls_back_to_reason() {
        let matcher = CauseMatcher::new().unwrap();
        let failure = matcher.classify(
            Some("PLUGIN"),
            "Received chat packet with missing or invalid signature.",
        );
        assert_eq!(
            failure,
            Some(AttestationFailure::Reason("missing or invalid signature"))
        );
    }

    #[test]
    fn test_reason_matching_is_case_insensitive() {
        let matcher = CauseMatcher::new().unwrap();
        assert_eq!(
            matcher.classify(None, "Invalid CHAT SIGNATURE"),
            Some(AttestationFailure::Reason("chat signature"))
        );
        assert_eq!(
            matcher.classify(None, "Your profile public key has expired"),
            Some(AttestationFailure::Reason("profile public key"))
        );
        assert_eq!(
            matcher.classify(None, "bad signature"),
            Some(AttestationFailure::Reason("signature"))
        );
    }

    #[test]
    fn test_unrelated_causes_do_not_match() {
        let matcher = CauseMatcher::new().unwrap();
        assert_eq!(matcher.classify(Some("IDLING"), "You have been idle for too long"), None);
        assert_eq!(matcher.classify(None, "Kicked by an operator"), None);
    }
}
