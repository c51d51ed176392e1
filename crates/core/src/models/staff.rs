//! Staff accounts and sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Manager,
    Receptionist,
    Housekeeping,
    Maintenance,
    Accounting,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Manager => "manager",
            StaffRole::Receptionist => "receptionist",
            StaffRole::Housekeeping => "housekeeping",
            StaffRole::Maintenance => "maintenance",
            StaffRole::Accounting => "accounting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(StaffRole::Admin),
            "manager" => Some(StaffRole::Manager),
            "receptionist" => Some(StaffRole::Receptionist),
            "housekeeping" => Some(StaffRole::Housekeeping),
            "maintenance" => Some(StaffRole::Maintenance),
            "accounting" => Some(StaffRole::Accounting),
            _ => None,
        }
    }
}

/// A back-office account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: StaffRole,
    pub is_active: bool,
    pub login_attempts: u32,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Staff {
    pub fn new(username: String, email: String, password_hash: String, role: StaffRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            role,
            is_active: true,
            login_attempts: 0,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, first_name: String, last_name: String) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }
}

/// Login session; the id doubles as the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(staff_id: Uuid, duration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            staff_id,
            created_at: now,
            expires_at: now + chrono::Duration::hours(duration_hours),
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Authenticated caller, resolved from a session
#[derive(Debug, Clone, Serialize)]
pub struct StaffContext {
    pub staff_id: Uuid,
    pub username: String,
    pub role: StaffRole,
    pub session_id: Uuid,
}
