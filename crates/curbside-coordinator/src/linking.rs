// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linking and redemption code generation.
//!
//! Codes are drawn from an alphabet without visually ambiguous characters
//! (no `0`/`O`, `1`/`I`/`L`). Linking codes are six characters shown as
//! `XXX-XXX`; redemption codes are a configurable run without separators.

use chrono::{DateTime, Duration, Utc};
use curbside_core::{ChannelMetadata, CurbsideError, LinkingCode, LinkingCodeStatus};
use rand::Rng;

/// Characters used in every generated code.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Characters in a linking code, excluding the separator.
pub const LINKING_CODE_LEN: usize = 6;

/// The only channel allowed to request linking codes.
pub const VEHICLE_CHANNEL: &str = "vehicle";

fn random_chars(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// A fresh linking code in display form, e.g. `K7P-2MX`.
pub fn generate_linking_code(rng: &mut impl Rng) -> String {
    let raw = random_chars(rng, LINKING_CODE_LEN);
    format!("{}-{}", &raw[..3], &raw[3..])
}

/// A fresh redemption code of `len` characters.
pub fn generate_redemption_code(rng: &mut impl Rng, len: usize) -> String {
    random_chars(rng, len)
}

/// Canonical `XXX-XXX` form of user input.
///
/// Case, spaces and dashes are ignored. Anything that cannot be a linking
/// code is a validation error. Characters outside the alphabet are allowed
/// through so that lookups fail as "invalid" rather than "malformed".
pub fn normalize_linking_code(input: &str) -> Result<String, CurbsideError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if compact.len() != LINKING_CODE_LEN || !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CurbsideError::validation(
            "code",
            "linking code must be six letters or digits",
        ));
    }
    Ok(format!("{}-{}", &compact[..3], &compact[3..]))
}

/// Canonical form of a redemption code as typed by staff.
pub fn normalize_redemption_code(input: &str) -> Result<String, CurbsideError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if compact.is_empty() || !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CurbsideError::validation(
            "code",
            "redemption code must be letters or digits",
        ));
    }
    Ok(compact)
}

/// Checks channel metadata on an issue request.
pub fn validate_channel(channel: &ChannelMetadata) -> Result<(), CurbsideError> {
    if channel.channel != VEHICLE_CHANNEL {
        return Err(CurbsideError::validation(
            "channel",
            format!("linking codes are issued to the `{VEHICLE_CHANNEL}` channel only"),
        ));
    }
    Ok(())
}

/// A new active code record valid for `ttl` from `now`.
pub fn new_linking_code(
    code: String,
    channel: ChannelMetadata,
    now: DateTime<Utc>,
    ttl: Duration,
) -> LinkingCode {
    LinkingCode {
        code,
        channel,
        status: LinkingCodeStatus::Active,
        created_at: now,
        expires_at: now + ttl,
        consumed_at: None,
        consumed_by: None,
    }
}

/// Why a presented linking code cannot be consumed.
pub fn unusable_reason(code: Option<&LinkingCode>, now: DateTime<Utc>) -> Option<CurbsideError> {
    match code.map(|c| c.effective_status(now)) {
        None | Some(LinkingCodeStatus::Consumed) => Some(CurbsideError::InvalidLinkingCode),
        Some(LinkingCodeStatus::Expired) => Some(CurbsideError::Expired {
            what: curbside_core::ExpiredKind::LinkingCode,
        }),
        Some(LinkingCodeStatus::Active) => None,
    }
}

/// Whether presenting `code` counts toward a session's failed-attempt bound.
///
/// Unknown and expired codes count. A code already consumed by some session
/// does not, so replaying a spent code never touches the presenting session.
pub fn counts_as_failed_attempt(code: Option<&LinkingCode>, now: DateTime<Utc>) -> bool {
    !matches!(
        code.map(|c| c.effective_status(now)),
        Some(LinkingCodeStatus::Consumed | LinkingCodeStatus::Active)
    )
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn generated_codes_use_the_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = generate_linking_code(&mut rng);
            assert_eq!(code.len(), 7);
            assert_eq!(&code[3..4], "-");
            assert!(
                code.bytes()
                    .filter(|b| *b != b'-')
                    .all(|b| ALPHABET.contains(&b))
            );
            assert!(!code.contains(['0', 'O', '1', 'I', 'L']));
        }
        assert_eq!(generate_redemption_code(&mut rng, 10).len(), 10);
    }

    #[test]
    fn normalization_accepts_loose_input() {
        assert_eq!(normalize_linking_code("abc123").unwrap(), "ABC-123");
        assert_eq!(normalize_linking_code(" abc - 123 ").unwrap(), "ABC-123");
        assert!(normalize_linking_code("ABC-12").is_err());
        assert!(normalize_linking_code("ABC-12!").is_err());
        assert_eq!(normalize_redemption_code("k7p2-m9xq").unwrap(), "K7P2M9XQ");
        assert!(normalize_redemption_code("  ").is_err());
    }

    #[test]
    fn only_vehicle_channel_may_request_codes() {
        let vehicle = ChannelMetadata {
            channel: "vehicle".into(),
            ..Default::default()
        };
        let phone = ChannelMetadata {
            channel: "phone".into(),
            ..Default::default()
        };
        assert!(validate_channel(&vehicle).is_ok());
        assert!(validate_channel(&phone).is_err());
    }

    #[test]
    fn unusable_reason_distinguishes_expired_from_invalid() {
        let now = Utc::now();
        let mut code = new_linking_code(
            "ABC-234".into(),
            ChannelMetadata::default(),
            now,
            Duration::seconds(60),
        );
        assert!(unusable_reason(Some(&code), now).is_none());
        assert!(matches!(
            unusable_reason(None, now),
            Some(CurbsideError::InvalidLinkingCode)
        ));
        assert!(matches!(
            unusable_reason(Some(&code), now + Duration::seconds(61)),
            Some(CurbsideError::Expired { .. })
        ));
        code.status = LinkingCodeStatus::Consumed;
        assert!(matches!(
            unusable_reason(Some(&code), now),
            Some(CurbsideError::InvalidLinkingCode)
        ));
    }

    #[test]
    fn only_unknown_or_expired_codes_count_as_failed_attempts() {
        let now = Utc::now();
        let mut code = new_linking_code(
            "ABC-234".into(),
            ChannelMetadata::default(),
            now,
            Duration::seconds(60),
        );
        assert!(counts_as_failed_attempt(None, now));
        assert!(!counts_as_failed_attempt(Some(&code), now));
        assert!(counts_as_failed_attempt(Some(&code), now + Duration::seconds(61)));
        code.status = LinkingCodeStatus::Consumed;
        assert!(!counts_as_failed_attempt(Some(&code), now));
        assert!(!counts_as_failed_attempt(Some(&code), now + Duration::seconds(61)));
    }
}
