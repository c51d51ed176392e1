//! Guest record model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identity document kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    Ktp,
    Passport,
    Sim,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Ktp => "ktp",
            IdType::Passport => "passport",
            IdType::Sim => "sim",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ktp" => Some(IdType::Ktp),
            "passport" => Some(IdType::Passport),
            "sim" => Some(IdType::Sim),
            _ => None,
        }
    }
}

/// A hotel guest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Stored trimmed and lowercased
    pub email: String,
    pub phone: Option<String>,
    pub id_type: IdType,
    pub id_number: Option<String>,
    pub nationality: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub loyalty_points: u32,
    pub is_vip: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    pub fn new(first_name: String, last_name: String, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email: normalize_email(email),
            phone: None,
            id_type: IdType::default(),
            id_number: None,
            nationality: "Indonesia".to_string(),
            date_of_birth: None,
            address: None,
            city: None,
            loyalty_points: 0,
            is_vip: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phone(mut self, phone: String) -> Self {
        self.phone = Some(phone);
        self
    }

    pub fn with_id_number(mut self, id_type: IdType, id_number: String) -> Self {
        self.id_type = id_type;
        self.id_number = Some(id_number);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("First name", &self.first_name), ("Last name", &self.last_name)] {
            let len = value.trim().chars().count();
            if len == 0 || len > 100 {
                return Err(Error::validation(format!(
                    "{field} must be between 1 and 100 characters"
                )));
            }
        }
        if !is_valid_email(&self.email) {
            return Err(Error::validation("Invalid email format"));
        }
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose email shape check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Per-guest stay summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestSummary {
    pub total_bookings: u32,
    pub completed_bookings: u32,
    pub cancelled_bookings: u32,
    pub total_spent: f64,
    pub first_visit: Option<NaiveDate>,
    pub last_visit: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalized() {
        let guest = Guest::new("Ayu".into(), "Lestari".into(), "  Ayu@Example.COM ");
        assert_eq!(guest.email, "ayu@example.com");
    }

    #[test]
    fn test_name_length_enforced() {
        let mut guest = Guest::new("".into(), "Lestari".into(), "ayu@example.com");
        assert!(guest.validate().is_err());
        guest.first_name = "x".repeat(101);
        assert!(guest.validate().is_err());
        guest.first_name = "Ayu".into();
        assert!(guest.validate().is_ok());
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("plain"));
    }
}
