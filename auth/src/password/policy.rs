use super::errors::PolicyViolation;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "admin123", "welcome1", "letmein1",
    "abc12345", "football", "baseball", "sunshine", "princess", "trustno1",
];

/// Password acceptance rules applied on registration, change and reset.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    min_length: usize,
}

impl PasswordPolicy {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }

    /// Check a candidate password.
    ///
    /// # Arguments
    /// * `password` - Candidate plaintext password
    /// * `email` - Email of the account, used for the similarity rule
    ///
    /// # Returns
    /// Every violated rule, empty when the password is acceptable
    pub fn check(&self, password: &str, email: &str) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();

        if password.chars().count() < self.min_length {
            violations.push(PolicyViolation::TooShort {
                min: self.min_length,
            });
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            violations.push(PolicyViolation::EntirelyNumeric);
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            violations.push(PolicyViolation::TooCommon);
        }

        let local_part = email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if local_part.len() >= 3 && lowered.contains(&local_part) {
            violations.push(PolicyViolation::TooSimilar);
        }

        violations
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(8)
    }
}
