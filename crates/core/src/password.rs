//! Account password policy.
//!
//! A password is accepted when it is at least [`MIN_PASSWORD_LENGTH`]
//! characters long and draws from at least [`MIN_CHARACTER_CLASSES`] of the
//! four classes: lowercase, uppercase, digit, and the specials in
//! [`SPECIAL_CHARACTERS`].

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// How many character classes a password must use.
pub const MIN_CHARACTER_CLASSES: usize = 3;

/// Characters counted as "special".
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*";

/// Why a password was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("password is required")]
    Empty,
    #[error("password must be at least 8 characters")]
    TooShort,
    #[error("password must use at least 3 of: uppercase, lowercase, digit or !@#$%^&*")]
    TooFewClasses,
}

/// Count how many character classes appear in `password`.
#[must_use]
pub fn character_classes(password: &str) -> usize {
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    [lower, upper, digit, special]
        .into_iter()
        .filter(|present| *present)
        .count()
}

/// Check a password against the policy, reporting the first failed rule.
///
/// # Errors
///
/// Returns the first rule the password breaks, checked in the order
/// empty, length, character classes.
pub fn check_password(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if character_classes(password) < MIN_CHARACTER_CLASSES {
        return Err(PasswordError::TooFewClasses);
    }
    Ok(())
}

/// Whether a password satisfies the policy.
#[must_use]
pub fn validate_password(password: &str) -> bool {
    check_password(password).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_examples() {
        assert!(!validate_password("Abcd123"));
        assert!(!validate_password("abcdefgh"));
        assert!(validate_password("Abcdefg1"));
    }

    #[test]
    fn test_length_is_checked_before_classes() {
        assert_eq!(check_password("Ab1!"), Err(PasswordError::TooShort));
        assert_eq!(check_password(""), Err(PasswordError::Empty));
    }

    #[test]
    fn test_two_classes_is_not_enough() {
        assert_eq!(check_password("abcd1234"), Err(PasswordError::TooFewClasses));
        assert_eq!(check_password("ABCD!@#$"), Err(PasswordError::TooFewClasses));
    }

    #[test]
    fn test_specials_outside_the_set_do_not_count() {
        // '-' and '_' are not in the special set: only lower + upper remain
        assert_eq!(check_password("abcd-EFG_"), Err(PasswordError::TooFewClasses));
        assert!(validate_password("abcd!EFG"));
    }

    #[test]
    fn test_character_classes() {
        assert_eq!(character_classes(""), 0);
        assert_eq!(character_classes("abc"), 1);
        assert_eq!(character_classes("aB1!"), 4);
    }

    #[test]
    fn test_exhaustive_class_combinations() {
        // Every combination of the four classes, padded to the minimum length.
        let samples = ["a", "B", "3", "#"];
        for mask in 0u8..16 {
            let mut password = String::new();
            for (bit, sample) in samples.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    password.push_str(sample);
                }
            }
            let classes = mask.count_ones() as usize;
            if password.is_empty() {
                continue;
            }
            while password.chars().count() < MIN_PASSWORD_LENGTH {
                let first = password.chars().next().unwrap_or('a');
                password.push(first);
            }
            assert_eq!(
                validate_password(&password),
                classes >= MIN_CHARACTER_CLASSES,
                "password {password:?} with {classes} classes"
            );
        }
    }
}
