//! API constants
//!
//! Fixed endpoints and reserved request parameter names of the FenixEdu API.

// Remote roots
pub const DEFAULT_API_BASE_URL: &str = "https://fenix.tecnico.ulisboa.pt/api/fenix/v1";
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://fenix.tecnico.ulisboa.pt";
pub const REFRESH_TOKEN_PATH: &str = "oauth/refresh_token";
pub const USER_DIALOG_PATH: &str = "oauth/userdialog";

// Language sent with every API call
pub const DEFAULT_LANG: &str = "en-GB";

// Reserved parameter keys
pub const PARAM_HTTP_METHOD: &str = "httpMethod";
pub const PARAM_ACCESS_TOKEN: &str = "access_token";
pub const PARAM_LANG: &str = "lang";
pub const PARAM_ENROL: &str = "enrol";

// Refresh grant
pub const GRANT_TYPE_REFRESH: &str = "refresh_token";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
