//! Email-format oracle and throwaway address generation.
//!
//! The oracle decides what the sign-up form *should* say about an address;
//! it never looks at the page. Expected outcomes come from here and nowhere
//! else, so borderline fixtures (a comma in the domain, a second `@`) follow
//! whatever the oracle says rather than a hand-written rule per fixture.

use uuid::Uuid;
use validator::ValidateEmail;

/// Length of the random part of a generated address
pub const RANDOM_PART_LEN: usize = 13;

/// Domain used for generated addresses
pub const GENERATED_DOMAIN: &str = "example.com";

/// Returns `true` when `candidate` is a well-formed email address.
///
/// Syntax checks (local part, domain labels, overall length) come from the
/// `validator` crate. On top of that the domain must end in a real top-level
/// domain: at least two letters, or an IDNA `xn--` label. Bare hosts
/// (`user@domain`) and address literals (`user@[127.0.0.1]`) are rejected.
#[must_use]
pub fn is_email(candidate: &str) -> bool {
    if !candidate.validate_email() {
        return false;
    }
    candidate
        .rsplit_once('@')
        .is_some_and(|(_, domain)| has_top_level_domain(domain))
}

fn has_top_level_domain(domain: &str) -> bool {
    let Some((_, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    if tld.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("xn--")) {
        return tld[4..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    }
    tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic)
}

/// Generate a unique address of the form `test.<random>@example.com`.
///
/// The random part is drawn independently on every call, so parallel cases
/// need no coordination to avoid colliding registrations.
#[must_use]
pub fn random_email() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("test.{}@{GENERATED_DOMAIN}", &id[..RANDOM_PART_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    mod oracle_tests {
        use super::*;

        #[test]
        fn test_plain_address_is_valid() {
            assert!(is_email("valid@example.com"));
            assert!(is_email("first.last+tag@sub.example.cz"));
        }

        #[test]
        fn test_sign_up_fixtures_are_invalid() {
            for email in [
                "invalid-email",
                "invalid@",
                "invalid@domain",
                "invalid@domain.",
                "invalid@domain..com",
                "invalid@domain,com",
                "invalid@ domain.com",
                "invalid@domain@domain.com",
            ] {
                assert!(!is_email(email), "{email} should be rejected");
            }
        }

        #[test]
        fn test_empty_string_is_invalid() {
            assert!(!is_email(""));
        }

        #[test]
        fn test_numeric_tld_is_invalid() {
            assert!(!is_email("user@host.123"));
        }

        #[test]
        fn test_ip_literal_is_invalid() {
            assert!(!is_email("user@[127.0.0.1]"));
        }

        #[test]
        fn test_single_letter_tld_is_invalid() {
            assert!(!is_email("user@example.c"));
        }

        #[test]
        fn test_punycode_tld_is_valid() {
            assert!(is_email("user@example.xn--p1ai"));
        }
    }

    mod generator_tests {
        use super::*;

        #[test]
        fn test_generated_shape() {
            let email = random_email();
            assert!(email.starts_with("test."));
            assert!(email.ends_with("@example.com"));
            let random = &email["test.".len()..email.len() - "@example.com".len()];
            assert_eq!(random.len(), RANDOM_PART_LEN);
            assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
        }

        #[test]
        fn test_generated_addresses_do_not_collide() {
            let emails: HashSet<String> = (0..500).map(|_| random_email()).collect();
            assert_eq!(emails.len(), 500);
        }
    }

    proptest! {
        #[test]
        fn prop_generated_address_satisfies_oracle(_seed in 0u32..64) {
            prop_assert!(is_email(&random_email()));
        }

        #[test]
        fn prop_whitespace_anywhere_is_rejected(
            local in "[a-z]{1,8}",
            domain in "[a-z]{1,8}",
            split in 0usize..8,
        ) {
            let host = format!("{domain}.com");
            let at = split.min(host.len());
            let candidate = format!("{local}@{} {}", &host[..at], &host[at..]);
            prop_assert!(!is_email(&candidate));
        }
    }
}
