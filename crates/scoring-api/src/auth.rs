//! Token authentication.
//!
//! Regular callers prove themselves with
//! `sha512_hex(account ++ login ++ salt)`. The administrator's token rotates
//! hourly: `sha512_hex(YYYYMMDDHH ++ admin_salt)`, with the hour taken in UTC.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::schemas::MethodRequest;

/// Default shared salt for regular callers.
pub const DEFAULT_SALT: &str = "Otus";
/// Default administrator login.
pub const DEFAULT_ADMIN_LOGIN: &str = "admin";
/// Default administrator salt.
pub const DEFAULT_ADMIN_SALT: &str = "42";

/// Secrets the authentication check is keyed with.
///
/// # Example
///
/// ```
/// use scoring_api::auth::Credentials;
/// use chrono::Utc;
///
/// let credentials = Credentials::default();
/// let token = credentials.user_token("horns&hoofs", "h&f");
/// assert_eq!(token.len(), 128);
/// assert_ne!(token, credentials.admin_token(Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    salt: String,
    admin_login: String,
    admin_salt: String,
}

impl Credentials {
    /// Creates credentials from explicit secrets.
    pub fn new(
        salt: impl Into<String>,
        admin_login: impl Into<String>,
        admin_salt: impl Into<String>,
    ) -> Self {
        Self {
            salt: salt.into(),
            admin_login: admin_login.into(),
            admin_salt: admin_salt.into(),
        }
    }

    /// Returns the administrator login.
    #[must_use]
    pub fn admin_login(&self) -> &str {
        &self.admin_login
    }

    /// Expected token for a regular caller.
    #[must_use]
    pub fn user_token(&self, account: &str, login: &str) -> String {
        sha512_hex(&format!("{account}{login}{}", self.salt))
    }

    /// Expected administrator token for the hour containing `now`.
    #[must_use]
    pub fn admin_token(&self, now: DateTime<Utc>) -> String {
        sha512_hex(&format!("{}{}", now.format("%Y%m%d%H"), self.admin_salt))
    }

    /// Checks the envelope's token against the current time.
    #[must_use]
    pub fn is_authenticated(&self, request: &MethodRequest) -> bool {
        self.is_authenticated_at(request, Utc::now())
    }

    /// Checks the envelope's token.
    ///
    /// A null login or token never authenticates; an absent or null account
    /// counts as the empty string.
    #[must_use]
    pub fn is_authenticated_at(&self, request: &MethodRequest, now: DateTime<Utc>) -> bool {
        let (Some(login), Some(token)) = (request.login.as_deref(), request.token.as_deref())
        else {
            return false;
        };

        let expected = if request.is_admin() {
            self.admin_token(now)
        } else {
            self.user_token(request.account.as_deref().unwrap_or_default(), login)
        };

        expected.as_bytes().ct_eq(token.as_bytes()).into()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_SALT, DEFAULT_ADMIN_LOGIN, DEFAULT_ADMIN_SALT)
    }
}

fn sha512_hex(input: &str) -> String {
    hex::encode(Sha512::digest(input.as_bytes()))
}
