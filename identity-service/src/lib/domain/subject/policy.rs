use auth::TokenLifetimes;
use chrono::Duration;

use crate::subject::errors::AuthError;
use crate::subject::models::JoinCommand;
use crate::subject::models::Role;

/// Which identifier a role registers and logs in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierField {
    Email,
    Username,
    /// Either one; a login identifier containing `@` is read as an email.
    EmailOrUsername,
    /// Credential-less subjects (guests): no login.
    None,
}

/// How a suspended subject with valid credentials is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionResponse {
    Forbidden,
    Unauthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTracking {
    /// Refresh tokens are bound to server-side sessions: logout revokes,
    /// refresh rotates and invalidates the previous token.
    Revocable,
    /// Refresh tokens are valid until they expire.
    Stateless,
}

/// Capability set that parameterizes the authentication flows per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicy {
    pub role: Role,
    pub identifier: IdentifierField,
    pub lifetimes: TokenLifetimes,
    pub suspension: SuspensionResponse,
    pub sessions: SessionTracking,
}

impl RolePolicy {
    pub fn is_revocable(&self) -> bool {
        self.sessions == SessionTracking::Revocable
    }

    /// Default policy of a role.
    pub fn default_for(role: Role) -> Self {
        let (identifier, access_minutes, refresh_days, suspension, sessions) = match role {
            Role::Member => (
                IdentifierField::EmailOrUsername,
                60,
                7,
                SuspensionResponse::Forbidden,
                SessionTracking::Revocable,
            ),
            Role::Admin | Role::Moderator => (
                IdentifierField::Email,
                30,
                7,
                SuspensionResponse::Forbidden,
                SessionTracking::Revocable,
            ),
            Role::Seller => (
                IdentifierField::Email,
                60,
                30,
                SuspensionResponse::Forbidden,
                SessionTracking::Revocable,
            ),
            Role::Customer => (
                IdentifierField::Email,
                60,
                30,
                SuspensionResponse::Unauthorized,
                SessionTracking::Revocable,
            ),
            Role::Guest => (
                IdentifierField::None,
                60,
                30,
                SuspensionResponse::Unauthorized,
                SessionTracking::Stateless,
            ),
        };

        Self {
            role,
            identifier,
            lifetimes: TokenLifetimes::new(
                Duration::minutes(access_minutes),
                Duration::days(refresh_days),
            ),
            suspension,
            sessions,
        }
    }

    /// Check that a join command carries what this role logs in with.
    ///
    /// # Errors
    /// * `Validation` - Required identifier or password missing, or credentials
    ///   given to a role that cannot log in
    pub fn validate_join(&self, command: &JoinCommand) -> Result<(), AuthError> {
        match self.identifier {
            IdentifierField::None
                if command.email.is_some()
                    || command.username.is_some()
                    || command.password.is_some() =>
            {
                return Err(AuthError::Validation(format!(
                    "{} subjects join without email, username or password",
                    self.role
                )));
            }
            IdentifierField::Email if command.email.is_none() => {
                return Err(AuthError::Validation("email is required".to_string()));
            }
            IdentifierField::Username if command.username.is_none() => {
                return Err(AuthError::Validation("username is required".to_string()));
            }
            IdentifierField::EmailOrUsername
                if command.email.is_none() && command.username.is_none() =>
            {
                return Err(AuthError::Validation(
                    "email or username is required".to_string(),
                ));
            }
            _ => {}
        }

        if self.identifier != IdentifierField::None && command.password.is_none() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        Ok(())
    }
}

/// Policies for every role.
#[derive(Debug, Clone)]
pub struct RolePolicies {
    policies: Vec<RolePolicy>,
}

impl RolePolicies {
    pub fn get(&self, role: Role) -> &RolePolicy {
        // Construction guarantees one entry per role.
        &self.policies[Self::index(role)]
    }

    /// Replace the token lifetimes of one role.
    pub fn with_lifetimes(mut self, role: Role, lifetimes: TokenLifetimes) -> Self {
        self.policies[Self::index(role)].lifetimes = lifetimes;
        self
    }

    fn index(role: Role) -> usize {
        Role::ALL
            .iter()
            .position(|candidate| *candidate == role)
            .unwrap_or_default()
    }
}

impl Default for RolePolicies {
    fn default() -> Self {
        Self {
            policies: Role::ALL.into_iter().map(RolePolicy::default_for).collect(),
        }
    }
}
