//! Common data types used throughout the client

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_wire_name_conversions;

/// HTTP verb of a transport request.
///
/// The API only needs the verbs below; `GET` is the default when a request
/// carries no explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl_wire_name_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Delete => "DELETE",
});

impl HttpMethod {
    /// Whether parameters travel in the query string rather than the body.
    #[must_use]
    pub const fn uses_query_string(&self) -> bool {
        matches!(self, Self::Get)
    }
}

/// Representation of the personal calendar endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarFormat {
    #[default]
    Json,
    /// iCalendar document
    Calendar,
}

impl_wire_name_conversions!(CalendarFormat {
    Json => "json",
    Calendar => "calendar",
});

/// Image format of a space blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlueprintFormat {
    #[default]
    Jpeg,
    Dwg,
}

impl_wire_name_conversions!(BlueprintFormat {
    Jpeg => "jpeg",
    Dwg => "dwg",
});

/// OAuth application credentials
///
/// Immutable for the lifetime of a client instance. The secret is never
/// printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl Credentials {
    /// Create a new credential set
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}
