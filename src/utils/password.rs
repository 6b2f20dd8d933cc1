use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ErrorMessage;

/// Upper bound on password length, in bytes
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a back-office password with Argon2id (crate defaults) and a fresh
/// random salt
///
/// The result is a PHC string (`$argon2id$v=19$m=...$<salt>$<hash>`) that
/// carries its own salt and parameters, so it is the only thing stored in
/// `users.password`.
pub fn hash(password: impl Into<String>) -> Result<String, ErrorMessage> {
    let password = password.into();
    check_length(&password)?;

    let salt = SaltString::generate(&mut OsRng);
    let hashed_password = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ErrorMessage::HashingError)?
        .to_string();

    Ok(hashed_password)
}

/// Check a login attempt against a stored PHC string
///
/// `Ok(false)` is a wrong password; `Err` means the input or the stored
/// hash is unusable.
pub fn compare(password: &str, hashed_password: &str) -> Result<bool, ErrorMessage> {
    check_length(password)?;

    let parsed_hash =
        PasswordHash::new(hashed_password).map_err(|_| ErrorMessage::InvalidHashFormat)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn check_length(password: &str) -> Result<(), ErrorMessage> {
    if password.is_empty() {
        return Err(ErrorMessage::EmptyPassword);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ErrorMessage::ExceededMaxPasswordLength(MAX_PASSWORD_LENGTH));
    }
    Ok(())
}
