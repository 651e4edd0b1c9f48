//! Postal address and customer contact snapshots.
//!
//! Orders denormalize both at checkout time so later profile edits never
//! alter historical records.

use serde::{Deserialize, Serialize};

/// A postal address snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Recipient or sender name.
    pub name: String,
    /// Street address.
    pub line1: String,
    /// Apartment, suite, etc.
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// ISO country code.
    pub country: String,
}

impl Address {
    /// Returns the names of required fields that are empty.
    ///
    /// An address with no missing fields is complete enough to ship to.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.line1.trim().is_empty() {
            missing.push("line1");
        }
        if self.city.trim().is_empty() {
            missing.push("city");
        }
        if self.zip.trim().is_empty() {
            missing.push("zip");
        }
        if self.country.trim().is_empty() {
            missing.push("country");
        }
        missing
    }

    /// Returns a copy cleaned for carrier APIs, which reject malformed input:
    /// ZIP stripped to digits, state truncated to its 2-letter code and
    /// uppercased, country code uppercased, whitespace trimmed everywhere.
    pub fn normalized(&self) -> Address {
        Address {
            name: self.name.trim().to_string(),
            line1: self.line1.trim().to_string(),
            line2: self
                .line2
                .as_deref()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            city: self.city.trim().to_string(),
            state: self
                .state
                .trim()
                .chars()
                .take(2)
                .collect::<String>()
                .to_uppercase(),
            zip: self.zip.chars().filter(|c| c.is_ascii_digit()).collect(),
            country: self.country.trim().to_uppercase(),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {} {} {}, {}",
            self.name, self.line1, self.city, self.state, self.zip, self.country
        )
    }
}

/// Customer contact details captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl CustomerContact {
    /// Returns true if the contact carries a usable email address.
    pub fn has_email(&self) -> bool {
        let email = self.email.trim();
        !email.is_empty() && email.contains('@')
    }
}
