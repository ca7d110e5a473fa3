//! Structural rules a new password must satisfy before it is sent.

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    SpecialCharacter,
}

impl PasswordRule {
    pub const ALL: [PasswordRule; 5] = [
        PasswordRule::MinLength,
        PasswordRule::Uppercase,
        PasswordRule::Lowercase,
        PasswordRule::Digit,
        PasswordRule::SpecialCharacter,
    ];

    pub fn is_satisfied_by(self, password: &str) -> bool {
        match self {
            PasswordRule::MinLength => password.chars().count() >= MIN_PASSWORD_LENGTH,
            PasswordRule::Uppercase => password.chars().any(|c| c.is_ascii_uppercase()),
            PasswordRule::Lowercase => password.chars().any(|c| c.is_ascii_lowercase()),
            PasswordRule::Digit => password.chars().any(|c| c.is_ascii_digit()),
            PasswordRule::SpecialCharacter => {
                password.chars().any(|c| SPECIAL_CHARACTERS.contains(c))
            }
        }
    }

    /// Sentence reported when the rule fails.
    pub fn violation(self) -> &'static str {
        match self {
            PasswordRule::MinLength => "Password must be at least 8 characters long.",
            PasswordRule::Uppercase => "Password must contain at least one uppercase letter.",
            PasswordRule::Lowercase => "Password must contain at least one lowercase letter.",
            PasswordRule::Digit => "Password must contain at least one number.",
            PasswordRule::SpecialCharacter => {
                "Password must contain at least one special character."
            }
        }
    }

    /// Short label for the live checklist.
    pub fn label(self) -> &'static str {
        match self {
            PasswordRule::MinLength => "At least 8 characters",
            PasswordRule::Uppercase => "One uppercase letter",
            PasswordRule::Lowercase => "One lowercase letter",
            PasswordRule::Digit => "One number",
            PasswordRule::SpecialCharacter => "One special character",
        }
    }
}

/// Per-rule pass/fail state, recomputed on every edit of the new password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleChecklist {
    passed: [bool; 5],
}

impl RuleChecklist {
    pub fn evaluate(password: &str) -> Self {
        Self {
            passed: PasswordRule::ALL.map(|rule| rule.is_satisfied_by(password)),
        }
    }

    pub fn passes(&self, rule: PasswordRule) -> bool {
        PasswordRule::ALL
            .iter()
            .position(|r| *r == rule)
            .map(|idx| self.passed[idx])
            .unwrap_or(false)
    }

    pub fn all_passed(&self) -> bool {
        self.passed.iter().all(|passed| *passed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PasswordRule, bool)> + '_ {
        PasswordRule::ALL.into_iter().zip(self.passed.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordValidation {
    pub is_valid: bool,
    pub failed: Vec<PasswordRule>,
}

impl PasswordValidation {
    /// One sentence per failed rule, space-joined. `None` when valid.
    pub fn error_message(&self) -> Option<String> {
        if self.is_valid {
            return None;
        }

        Some(
            self.failed
                .iter()
                .map(|rule| rule.violation())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

pub fn validate(password: &str) -> PasswordValidation {
    let failed: Vec<PasswordRule> = RuleChecklist::evaluate(password)
        .iter()
        .filter(|(_, passed)| !passed)
        .map(|(rule, _)| rule)
        .collect();

    PasswordValidation {
        is_valid: failed.is_empty(),
        failed,
    }
}

#[cfg(test)]
#[path = "tests/password_rules_tests.rs"]
mod tests;
