//! Identifier and validated scalar types for the project domain.

use super::ProjectDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a project posted by an employer.
    ProjectId
);

uuid_identifier!(
    /// Unique identifier for a freelancer's application to a project.
    ApplicationId
);

uuid_identifier!(
    /// Identifier of a marketplace account (employer or freelancer).
    UserId
);

uuid_identifier!(
    /// Identifier of a project category.
    CategoryId
);

/// Project budget held as an integer amount of minor currency units.
///
/// The payments subsystem consumes budgets in minor units, so the domain keeps
/// that representation. Decimal text is parsed once, when a project is
/// created, and formatted back for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Budget(i64);

impl Budget {
    const MINOR_UNITS_PER_MAJOR: i64 = 100;

    /// Creates a budget from an amount of minor units (for example cents).
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::NegativeBudget`] when `minor_units` is
    /// below zero.
    pub const fn from_minor_units(minor_units: i64) -> Result<Self, ProjectDomainError> {
        if minor_units < 0 {
            return Err(ProjectDomainError::NegativeBudget(minor_units));
        }
        Ok(Self(minor_units))
    }

    /// Parses a decimal amount such as `"1250"`, `"1250.5"` or `"1250.50"`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::InvalidBudget`] when the text is not a
    /// non-negative decimal with at most two fractional digits.
    pub fn parse(text: &str) -> Result<Self, ProjectDomainError> {
        let invalid = || ProjectDomainError::InvalidBudget(text.to_owned());
        let trimmed = text.trim();
        let (major_text, minor_text) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        let is_digits = |value: &str| value.chars().all(|ch| ch.is_ascii_digit());
        if major_text.is_empty() || !is_digits(major_text) || !is_digits(minor_text) {
            return Err(invalid());
        }
        if minor_text.len() > 2 || (trimmed.contains('.') && minor_text.is_empty()) {
            return Err(invalid());
        }

        let major: i64 = major_text.parse().map_err(|_| invalid())?;
        let minor: i64 = match minor_text.len() {
            0 => 0,
            1 => minor_text.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => minor_text.parse().map_err(|_| invalid())?,
        };

        major
            .checked_mul(Self::MINOR_UNITS_PER_MAJOR)
            .and_then(|value| value.checked_add(minor))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.0.div_euclid(Self::MINOR_UNITS_PER_MAJOR);
        let minor = self.0.rem_euclid(Self::MINOR_UNITS_PER_MAJOR);
        write!(f, "{major}.{minor:02}")
    }
}

/// Reference to a payment intent held by the external payments system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Creates a validated payment reference.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectDomainError::EmptyPaymentReference`] when the value is
    /// empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, ProjectDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(ProjectDomainError::EmptyPaymentReference);
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the reference as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PaymentReference {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
