//! Input validation: order numbers (Luhn) and login credentials.

/// Credential validation errors, mapped to HTTP 400 by the gateway.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("login and password are required")]
    Missing,

    #[error("login must be 3-50 characters")]
    LoginLength,

    #[error("password must be at least 6 characters")]
    PasswordLength,
}

/// Single validation path for registration input.
pub fn validate_credentials(login: &str, password: &str) -> Result<(), CredentialsError> {
    if login.is_empty() || password.is_empty() {
        return Err(CredentialsError::Missing);
    }
    if login.chars().count() < 3 || login.chars().count() > 50 {
        return Err(CredentialsError::LoginLength);
    }
    if password.chars().count() < 6 {
        return Err(CredentialsError::PasswordLength);
    }
    Ok(())
}

/// Mod-10 checksum over a digit string.
///
/// Rejects anything that is not pure ASCII digits (including whitespace)
/// and strings shorter than two digits.
pub fn luhn(number: &str) -> bool {
    if number.len() < 2 || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}
