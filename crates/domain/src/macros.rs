//! Macro for implementing Display and FromStr for wire-name enums
//!
//! Enums that travel over the wire as a fixed token (HTTP verbs, grant types)
//! share one implementation: `Display` writes the token verbatim and `FromStr`
//! accepts it in any letter case.
//!
//! # Example
//!
//! ```rust
//! use fenixedu_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Format {
//!     Json,
//!     Calendar,
//! }
//!
//! impl_wire_name_conversions!(Format {
//!     Json => "json",
//!     Calendar => "calendar",
//! });
//!
//! assert_eq!(Format::Json.to_string(), "json");
//! assert_eq!("CALENDAR".parse::<Format>(), Ok(Format::Calendar));
//! ```

/// Implements Display and FromStr for an enum with fixed wire names
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their wire token
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire token for this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
