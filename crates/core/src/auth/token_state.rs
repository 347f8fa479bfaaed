//! In-memory OAuth token state

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

/// Access/refresh token pair plus access token expiry
///
/// The access token is only usable while `now < access_token_expiry`. A fresh
/// state starts with an expiry at the minimum representable instant, so it is
/// always considered expired.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: Option<String>,
    pub access_token_expiry: DateTime<Utc>,
    pub refresh_token: Option<String>,
}

impl Default for TokenState {
    fn default() -> Self {
        Self { access_token: None, access_token_expiry: DateTime::<Utc>::MIN_UTC, refresh_token: None }
    }
}

impl TokenState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the access token may be used at `now`
    #[must_use]
    pub fn is_access_token_valid(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_some() && now < self.access_token_expiry
    }

    /// Access token if still valid at `now`
    #[must_use]
    pub fn valid_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        if self.is_access_token_valid(now) {
            self.access_token.as_deref()
        } else {
            None
        }
    }

    /// Replace the access token and its expiry together
    pub fn apply_refresh(&mut self, access_token: String, expiry: DateTime<Utc>) {
        self.access_token = Some(access_token);
        self.access_token_expiry = expiry;
    }

    /// Store a new refresh token and invalidate the current access token
    pub fn replace_refresh_token(&mut self, refresh_token: String) {
        self.refresh_token = Some(refresh_token);
        self.invalidate_access_token();
    }

    /// Mark the access token as expired without dropping the refresh token
    pub fn invalidate_access_token(&mut self) {
        self.access_token = None;
        self.access_token_expiry = DateTime::<Utc>::MIN_UTC;
    }

    /// Time left before the access token expires; `None` when already expired
    #[must_use]
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.is_access_token_valid(now).then(|| self.access_token_expiry - now)
    }
}

// Token values never reach logs
impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
