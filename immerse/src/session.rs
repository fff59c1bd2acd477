//! Authentication, registration and profile editing.

use std::sync::Arc;

use email_address::EmailAddress;
use log::{debug, warn};
use serde_json::{Value, json};

use crate::backend::{AuthProvider, DocumentStore, decode, encode};
use crate::config::RegistrationSettings;
use crate::errors::{ImmerseError, NotAuthenticated, ValidationError, ValidationIssue};
use crate::keys;
use crate::types::{CurrentUser, User};

const MAX_USERNAME_LEN: usize = 30;

/// Sign-up form contents.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub username: String,
    pub fullname: String,
}

/// Fields a user may edit on their own profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

/// The viewer's session with the authentication provider.
pub struct Session {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
    settings: RegistrationSettings,
}

impl Session {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>, settings: RegistrationSettings) -> Self {
        Self { auth, store, settings }
    }

    /// The signed-in viewer. Every write path starts here.
    pub fn viewer(&self) -> Result<CurrentUser, NotAuthenticated> {
        self.auth.current_user().ok_or(NotAuthenticated)
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth.current_user().is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> crate::Result<CurrentUser> {
        let viewer = self.auth.sign_in(email, password).await.inspect_err(|err| {
            warn!("login failed for {email}: {err}");
        })?;
        debug!("signed in as {}", viewer.id);
        Ok(viewer)
    }

    /// Creates the account and its profile document with a unique username.
    pub async fn register(&self, registration: Registration) -> crate::Result<User> {
        self.validate_registration(&registration)?;
        let base = normalize_username(&registration.username)?;
        let username = self.claim_username(&base).await?;
        let account = self
            .auth
            .create_account(&registration.email, &registration.password)
            .await?;
        let user = User::new(account.id, username, registration.email, registration.fullname);
        self.write_profile(&user).await?;
        Ok(user)
    }

    /// Writes the profile for an account created through an external identity provider.
    pub async fn register_external(
        &self,
        uid: &str,
        email: &str,
        username: &str,
        fullname: &str,
    ) -> crate::Result<User> {
        let base = normalize_username(username)?;
        let username = self.claim_username(&base).await?;
        let user = User::new(uid, username, email, fullname);
        self.write_profile(&user).await?;
        Ok(user)
    }

    async fn write_profile(&self, user: &User) -> crate::Result<()> {
        let document = encode(user).map_err(|err| ImmerseError::write("user profile", err))?;
        self.store
            .set(&keys::user(&user.id), document)
            .await
            .map_err(|err| ImmerseError::write("user profile", err))
    }

    /// Finds the first free username among `base`, `base1`, `base2`, ...
    ///
    /// Gives up after the configured number of attempts.
    pub async fn claim_username(&self, base: &str) -> crate::Result<String> {
        for attempt in 0..self.settings.max_username_attempts {
            let candidate = if attempt == 0 {
                base.to_string()
            } else {
                format!("{base}{attempt}")
            };
            let taken = self
                .store
                .find_eq(keys::USERS, "username", &json!(candidate))
                .await
                .map_err(|err| ImmerseError::fetch("users", err))?;
            if taken.is_empty() {
                return Ok(candidate);
            }
            debug!("username {candidate} is taken");
        }
        Err(ValidationError::single(
            "username",
            "username.unavailable",
            format!(
                "no free username found for `{base}` after {} attempts",
                self.settings.max_username_attempts
            ),
        )
        .into())
    }

    fn validate_registration(&self, registration: &Registration) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if !EmailAddress::is_valid(&registration.email) {
            issues.push(ValidationIssue::new("email", "validation.email", "email address is invalid"));
        }
        if registration.password.chars().count() < self.settings.min_password_len {
            issues.push(ValidationIssue::new(
                "password",
                "validation.length",
                format!("password must be at least {} characters", self.settings.min_password_len),
            ));
        }
        if registration.fullname.trim().is_empty() {
            issues.push(ValidationIssue::new("fullname", "validation.required", "full name is required"));
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    pub async fn sign_out(&self) -> crate::Result<()> {
        self.auth.sign_out().await
    }

    pub async fn delete_account(&self) -> crate::Result<()> {
        self.viewer()?;
        self.auth.delete_account().await
    }

    pub async fn send_password_reset(&self, email: &str) -> crate::Result<()> {
        self.auth.send_password_reset(email).await
    }

    /// The viewer's own profile document.
    pub async fn current_profile(&self) -> crate::Result<User> {
        let viewer = self.viewer()?;
        let document = self
            .store
            .get(&keys::user(&viewer.id))
            .await
            .map_err(|err| ImmerseError::fetch("user profile", err))?
            .ok_or_else(|| ImmerseError::not_found("user", &viewer.id))?;
        decode(document).map_err(|err| ImmerseError::fetch("user profile", err))
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> crate::Result<()> {
        let viewer = self.viewer()?;
        let mut fields = serde_json::Map::new();
        if let Some(fullname) = update.fullname {
            fields.insert("fullname".into(), Value::String(fullname));
        }
        if let Some(username) = update.username {
            let username = normalize_username(&username)?;
            let holders = self
                .store
                .find_eq(keys::USERS, "username", &json!(username))
                .await
                .map_err(|err| ImmerseError::fetch("users", err))?;
            if holders.iter().any(|holder| holder.id != viewer.id) {
                return Err(ValidationError::single("username", "username.unavailable", "username is taken").into());
            }
            fields.insert("username".into(), Value::String(username));
        }
        if let Some(bio) = update.bio {
            fields.insert("bio".into(), Value::String(bio));
        }
        if let Some(url) = update.profile_image_url {
            fields.insert("profileImageUrl".into(), Value::String(url));
        }
        if fields.is_empty() {
            return Ok(());
        }
        self.store
            .update(&keys::user(&viewer.id), fields)
            .await
            .map_err(|err| ImmerseError::write("user profile", err))
    }
}

/// Lowercases and strips everything but `[a-z0-9._]`.
pub fn normalize_username(raw: &str) -> Result<String, ValidationError> {
    let normalized: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '_')
        .take(MAX_USERNAME_LEN)
        .collect();
    if normalized.is_empty() {
        return Err(ValidationError::single(
            "username",
            "validation.required",
            "username must contain letters or digits",
        ));
    }
    Ok(normalized)
}
