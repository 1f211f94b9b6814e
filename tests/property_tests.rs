//! Property-based tests for the error translator and platform parsing.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Translation is total: every input yields a non-empty string
//! - Known codes ignore the raw message
//! - Unknown codes with a message pass the message through
//! - Platform names round-trip through Display and FromStr

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use garage_connect::services::{AUTH_FALLBACK, GENERIC_FALLBACK, STORAGE_FALLBACK};
use garage_connect::{
    BackendErrorInfo, PlatformKind, handle_auth_error, handle_storage_error, translate,
};
use proptest::prelude::*;

const KNOWN_CODES: &[&str] = &[
    "auth/wrong-password",
    "auth/user-not-found",
    "auth/invalid-email",
    "auth/email-already-in-use",
    "auth/too-many-requests",
    "storage/unauthorized",
    "storage/object-not-found",
    "storage/invalid-checksum",
];

fn any_info() -> impl Strategy<Value = BackendErrorInfo> {
    (
        proptest::option::of(prop_oneof![
            "(auth|storage|app|firestore)/[a-z-]{0,24}",
            ".{0,32}",
        ]),
        proptest::option::of(".{0,64}"),
    )
        .prop_map(|(code, message)| BackendErrorInfo { code, message })
}

proptest! {
    /// Property: every translator returns a non-empty string for any input.
    #[test]
    fn prop_translation_is_total(info in any_info()) {
        prop_assert!(!translate(&info).trim().is_empty());
        prop_assert!(!handle_auth_error(&info).trim().is_empty());
        prop_assert!(!handle_storage_error(&info).trim().is_empty());
    }

    /// Property: a recognized code maps to the same string whatever the message.
    #[test]
    fn prop_known_code_ignores_message(
        idx in 0..KNOWN_CODES.len(),
        message in proptest::option::of(".{0,64}"),
    ) {
        let code = KNOWN_CODES[idx];
        let bare = translate(&BackendErrorInfo::from_code(code));
        let with_message = translate(&BackendErrorInfo {
            code: Some(code.to_string()),
            message,
        });
        prop_assert_eq!(bare, with_message);
    }

    /// Property: an unrecognized code surfaces the backend's own message.
    #[test]
    fn prop_unknown_code_passes_message_through(
        suffix in "[a-z]{1,12}",
        message in "[A-Za-z][A-Za-z ]{0,40}",
    ) {
        let info = BackendErrorInfo::new(format!("unknown/{suffix}"), message.clone());
        prop_assert_eq!(translate(&info), message);
    }

    /// Property: whitespace-only messages fall back to the namespace string.
    #[test]
    fn prop_blank_message_falls_back(
        namespace in prop_oneof![Just("auth"), Just("storage"), Just("other")],
        blank in "[ \t\n]{0,8}",
    ) {
        let info = BackendErrorInfo::new(format!("{namespace}/never-seen-code"), blank);
        let expected = match namespace {
            "auth" => AUTH_FALLBACK,
            "storage" => STORAGE_FALLBACK,
            _ => GENERIC_FALLBACK,
        };
        prop_assert_eq!(translate(&info), expected);
    }

    /// Property: platform names round-trip through Display and FromStr.
    #[test]
    fn prop_platform_roundtrip(web in any::<bool>()) {
        let kind = if web { PlatformKind::Web } else { PlatformKind::NativeMobile };
        let parsed: PlatformKind = kind.to_string().parse().expect("parse");
        prop_assert_eq!(parsed, kind);
    }
}
