//! Contact records loaded from the ledger

use std::fmt;

/// Classification controlling which template and attachment a contact gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Mechanical,
    Cs,
    General,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Mechanical, Category::Cs, Category::General];

    /// Map a raw ledger value to a category.
    ///
    /// Only the exact names `Mechanical` and `CS` (surrounding whitespace
    /// ignored) are recognized; everything else, blank included, is `General`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim() {
            "Mechanical" => Category::Mechanical,
            "CS" => Category::Cs,
            _ => Category::General,
        }
    }

    /// Name as written in the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mechanical => "Mechanical",
            Category::Cs => "CS",
            Category::General => "General",
        }
    }

    /// File name stem used for this category's templates
    pub fn template_stem(&self) -> &'static str {
        match self {
            Category::Mechanical => "mechanical",
            Category::Cs => "cs",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Send status of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Sent,
}

impl Status {
    pub const SENT: &'static str = "Sent";

    /// Only the exact value `Sent` counts as sent
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == Self::SENT {
            Status::Sent
        } else {
            Status::Pending
        }
    }
}

/// A sponsor contact as read from one ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Trimmed organization name
    pub organization: String,
    /// Trimmed point-of-contact name
    pub name: String,
    /// Trimmed, lowercased email address
    pub email: String,
    pub category: Category,
    pub status: Status,
    /// Raw `Sent Timestamp` value, if any
    pub sent_at: Option<String>,
}

impl Contact {
    /// Identity used to locate this contact's row(s) in the ledger
    pub fn key(&self) -> ContactKey {
        ContactKey::new(&self.email, &self.organization)
    }
}

/// The (email, organization) pair identifying a contact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContactKey {
    email: String,
    organization: String,
}

impl ContactKey {
    /// Build a key from raw values, applying the ledger's normalization
    pub fn new(email: &str, organization: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            organization: organization.trim().to_owned(),
        }
    }
}
