//! # Order Number Validation
//!
//! Order numbers are checked with the Luhn formula before an order is accepted.
//! The rightmost digit is the check digit; every second digit counting leftwards
//! from it is doubled (minus 9 when the result exceeds 9) and the number is valid
//! when the digit sum is a multiple of 10.

/// Stateless Luhn validator for order numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderNumberValidator;

impl OrderNumberValidator {
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` when `number` is a non-empty string of ASCII digits that
    /// satisfies the Luhn check. Never fails: malformed input is simply invalid.
    pub fn validate(&self, number: &str) -> bool {
        validate(number)
    }
}

/// Free-function form of [`OrderNumberValidator::validate`].
pub fn validate(number: &str) -> bool {
    let digits = number.as_bytes();
    if digits.is_empty() {
        return false;
    }

    let last_index_parity = (digits.len() - 1) % 2;
    let mut sum = 0u32;
    for (i, byte) in digits.iter().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(byte - b'0');
        if i % 2 != last_index_parity {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_valid_numbers() {
        let validator = OrderNumberValidator::new();
        for number in ["4561261212345467", "79927398713", "12345678903", "0", "18"] {
            assert!(validator.validate(number), "{number} should be valid");
        }
    }

    #[test]
    fn rejects_altered_check_digit() {
        assert!(!validate("4561261212345464"));
        assert!(!validate("79927398710"));
        assert!(!validate("12345678901"));
    }

    #[test]
    fn rejects_single_digit_changes() {
        let valid = "4561261212345467";
        for position in 0..valid.len() {
            let original = valid.as_bytes()[position];
            // +1 changes the contribution of both doubled and undoubled digits
            let replaced = if original == b'9' { b'0' } else { original + 1 };
            let mut bytes = valid.as_bytes().to_vec();
            bytes[position] = replaced;
            let altered = String::from_utf8(bytes).unwrap();
            assert!(!validate(&altered), "{altered} should be invalid");
        }
    }

    #[test]
    fn rejects_empty_and_non_numeric_input() {
        assert!(!validate(""));
        assert!(!validate("12a4"));
        assert!(!validate(" 79927398713"));
        assert!(!validate("7992-7398713"));
        assert!(!validate("٣"));
    }
}
