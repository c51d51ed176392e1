//! Staff authentication: argon2 password hashing, login lockout, sessions

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{BootstrapAdmin, Config};
use crate::error::{Error, Result};
use crate::models::{is_valid_email, normalize_email, Session, Staff, StaffContext, StaffRole};
use crate::permissions::{PermissionMatrix, StaffAction};
use crate::storage::StaffRepository;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct AuthPolicy {
    pub session_hours: i64,
    pub max_login_attempts: u32,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            session_hours: 12,
            max_login_attempts: 5,
        }
    }
}

impl From<&Config> for AuthPolicy {
    fn from(config: &Config) -> Self {
        Self {
            session_hours: config.session_hours,
            max_login_attempts: config.max_login_attempts,
        }
    }
}

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub staff: Staff,
}

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: StaffRole,
}

pub struct AuthService<'a, R: StaffRepository> {
    repo: &'a R,
    policy: AuthPolicy,
}

impl<'a, R: StaffRepository> AuthService<'a, R> {
    pub fn new(repo: &'a R, policy: AuthPolicy) -> Self {
        Self { repo, policy }
    }

    /// Verify credentials and open a session.
    ///
    /// Each failure bumps the account's attempt counter; once it reaches the
    /// limit the account is locked until an administrator resets it.
    #[instrument(skip(self, password))]
    pub fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let username = username.trim();
        let Some(staff) = self.repo.find_staff_by_username(username)? else {
            warn!("Login for unknown username");
            return Err(Error::Authentication("Invalid username or password".into()));
        };

        if !staff.is_active {
            warn!(staff_id = %staff.id, "Login for inactive account");
            return Err(Error::Authentication("Account is disabled".into()));
        }

        if staff.login_attempts >= self.policy.max_login_attempts {
            warn!(staff_id = %staff.id, attempts = staff.login_attempts, "Login for locked account");
            return Err(Error::AccountLocked(
                "Too many failed login attempts. Contact an administrator.".into(),
            ));
        }

        if !verify_password(password, &staff.password_hash)? {
            let attempts = self.repo.record_failed_login(staff.id)?;
            warn!(staff_id = %staff.id, attempts, "Rejected login");
            return Err(Error::Authentication("Invalid username or password".into()));
        }

        self.repo.record_successful_login(staff.id)?;
        let session = Session::new(staff.id, self.policy.session_hours);
        self.repo.create_session(&session)?;

        info!(staff_id = %staff.id, "Staff logged in");
        Ok(LoginOutcome { session, staff })
    }

    pub fn logout(&self, session_id: Uuid) -> Result<()> {
        self.repo.delete_session(session_id)?;
        info!(%session_id, "Session closed");
        Ok(())
    }

    /// Resolve a bearer token to the calling staff member
    pub fn authenticate(&self, token: Uuid) -> Result<StaffContext> {
        let session = self
            .repo
            .find_valid_session(token)?
            .ok_or_else(|| Error::Authentication("Session expired or invalid".into()))?;

        let staff = self
            .repo
            .find_staff_by_id(session.staff_id)?
            .filter(|s| s.is_active)
            .ok_or_else(|| Error::Authentication("Account is disabled".into()))?;

        Ok(StaffContext {
            staff_id: staff.id,
            username: staff.username,
            role: staff.role,
            session_id: session.id,
        })
    }

    /// Replace the caller's password and revoke their other sessions
    #[instrument(skip(self, ctx, current, new), fields(staff_id = %ctx.staff_id))]
    pub fn change_password(&self, ctx: &StaffContext, current: &str, new: &str) -> Result<()> {
        let staff = self
            .repo
            .find_staff_by_id(ctx.staff_id)?
            .ok_or_else(|| Error::not_found("Staff", ctx.staff_id))?;

        if !verify_password(current, &staff.password_hash)? {
            return Err(Error::Authentication("Current password is incorrect".into()));
        }
        check_password_strength(new)?;

        self.repo.update_password(staff.id, &hash_password(new)?)?;
        let revoked = self.repo.delete_other_sessions(staff.id, ctx.session_id)?;
        info!(revoked, "Password changed");
        Ok(())
    }

    /// Create a staff account; admin only
    #[instrument(skip(self, ctx, new), fields(username = %new.username))]
    pub fn register_staff(&self, ctx: &StaffContext, new: NewStaff) -> Result<Staff> {
        PermissionMatrix::require(ctx, StaffAction::RegisterStaff)?;
        self.create_account(new)
    }

    /// Seed the first administrator when no staff exist yet
    pub fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<Option<Staff>> {
        if self.repo.count_staff()? > 0 {
            return Ok(None);
        }
        let staff = self.create_account(NewStaff {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            first_name: "Administrator".into(),
            last_name: String::new(),
            role: StaffRole::Admin,
        })?;
        info!(username = %staff.username, "Bootstrap administrator created");
        Ok(Some(staff))
    }

    pub fn purge_expired_sessions(&self) -> Result<u64> {
        self.repo.cleanup_expired_sessions()
    }

    fn create_account(&self, new: NewStaff) -> Result<Staff> {
        let username = new.username.trim().to_string();
        let email = normalize_email(&new.email);
        if username.is_empty() {
            return Err(Error::validation("Username is required"));
        }
        if !is_valid_email(&email) {
            return Err(Error::validation("Invalid email format"));
        }
        check_password_strength(&new.password)?;

        if self.repo.staff_exists(&username, &email)? {
            return Err(Error::Duplicate("Username or email already exists".into()));
        }

        let staff = Staff::new(username, email, hash_password(&new.password)?, new.role)
            .with_name(new.first_name, new.last_name);
        self.repo.create_staff(&staff)?;
        Ok(staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn admin_ctx(db: &Database) -> StaffContext {
        let auth = AuthService::new(db, AuthPolicy::default());
        auth.bootstrap_admin(&BootstrapAdmin {
            username: "admin".into(),
            password: "secret123".into(),
            email: "admin@example.com".into(),
        })
        .unwrap();
        let outcome = auth.login("admin", "secret123").unwrap();
        auth.authenticate(outcome.session.id).unwrap()
    }

    fn clerk() -> NewStaff {
        NewStaff {
            username: "desk".into(),
            email: "desk@example.com".into(),
            password: "front-desk".into(),
            first_name: "Dewi".into(),
            last_name: "Sari".into(),
            role: StaffRole::Receptionist,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_bootstrap_only_once() {
        let db = Database::open_in_memory().unwrap();
        let auth = AuthService::new(&db, AuthPolicy::default());
        let admin = BootstrapAdmin {
            username: "admin".into(),
            password: "secret123".into(),
            email: "admin@example.com".into(),
        };
        assert!(auth.bootstrap_admin(&admin).unwrap().is_some());
        assert!(auth.bootstrap_admin(&admin).unwrap().is_none());
    }

    #[test]
    fn test_login_and_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        assert_eq!(ctx.username, "admin");
        assert_eq!(ctx.role, StaffRole::Admin);

        let staff = db.staff().find_by_id(ctx.staff_id).unwrap().unwrap();
        assert!(staff.last_login.is_some());
    }

    #[test]
    fn test_logout_invalidates_session() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        let auth = AuthService::new(&db, AuthPolicy::default());
        auth.logout(ctx.session_id).unwrap();
        assert!(matches!(auth.authenticate(ctx.session_id), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_lockout_after_repeated_failures() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        let policy = AuthPolicy {
            max_login_attempts: 3,
            ..AuthPolicy::default()
        };
        let auth = AuthService::new(&db, policy);
        auth.register_staff(&ctx, clerk()).unwrap();

        for _ in 0..3 {
            assert!(matches!(auth.login("desk", "wrong"), Err(Error::Authentication(_))));
        }
        // Correct password no longer helps
        assert!(matches!(auth.login("desk", "front-desk"), Err(Error::AccountLocked(_))));
    }

    #[test]
    fn test_success_resets_attempts() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        let auth = AuthService::new(&db, AuthPolicy::default());
        let staff = auth.register_staff(&ctx, clerk()).unwrap();

        auth.login("desk", "wrong").unwrap_err();
        auth.login("desk", "front-desk").unwrap();
        assert_eq!(db.staff().find_by_id(staff.id).unwrap().unwrap().login_attempts, 0);
    }

    #[test]
    fn test_only_admin_registers() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        let auth = AuthService::new(&db, AuthPolicy::default());
        auth.register_staff(&ctx, clerk()).unwrap();

        let desk = auth.login("desk", "front-desk").unwrap();
        let desk_ctx = auth.authenticate(desk.session.id).unwrap();
        let err = auth
            .register_staff(
                &desk_ctx,
                NewStaff {
                    username: "other".into(),
                    email: "other@example.com".into(),
                    ..clerk()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_register_rejects_duplicates_and_short_passwords() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        let auth = AuthService::new(&db, AuthPolicy::default());
        auth.register_staff(&ctx, clerk()).unwrap();

        assert!(matches!(auth.register_staff(&ctx, clerk()), Err(Error::Duplicate(_))));
        let short = NewStaff {
            username: "new".into(),
            email: "new@example.com".into(),
            password: "12345".into(),
            ..clerk()
        };
        assert!(matches!(auth.register_staff(&ctx, short), Err(Error::Validation(_))));
    }

    #[test]
    fn test_change_password_revokes_other_sessions() {
        let db = Database::open_in_memory().unwrap();
        let ctx = admin_ctx(&db);
        let auth = AuthService::new(&db, AuthPolicy::default());
        let other = auth.login("admin", "secret123").unwrap();

        assert!(matches!(
            auth.change_password(&ctx, "nope", "newsecret"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            auth.change_password(&ctx, "secret123", "short"),
            Err(Error::Validation(_))
        ));

        auth.change_password(&ctx, "secret123", "newsecret").unwrap();
        assert!(auth.authenticate(ctx.session_id).is_ok());
        assert!(auth.authenticate(other.session.id).is_err());
        assert!(auth.login("admin", "newsecret").is_ok());
    }
}
