/// Shortest secret accepted by login, registration and password changes.
pub const MIN_SECRET_LEN: usize = 4;

/// Hash a secret for storage.
pub fn hash_secret(secret: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(secret, cost)
}

/// Check a secret against a stored hash.
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    bcrypt::verify(secret, hash).unwrap_or(false)
}

/// Trimmed, non-blank field value or a message naming the field.
pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(trimmed)
    }
}

pub fn check_secret(secret: &str) -> Result<(), String> {
    if secret.trim().is_empty() {
        return Err("Password is required".to_string());
    }
    if secret.chars().count() < MIN_SECRET_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_SECRET_LEN
        ));
    }
    Ok(())
}
