//! Newtype wrappers for job identifiers and download tokens.
//!
//! Job ids may be supplied by the caller, so they wrap a validated `String`
//! rather than a `Uuid`. Download tokens are capability strings: 32 bytes
//! from the OS random source, hex-encoded.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Longest identifier accepted from a caller.
pub const MAX_ID_LEN: usize = 128;

/// Macro to define a validated string identifier.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a caller-supplied value.
            ///
            /// Identifiers end up in file paths and URLs, so only ASCII
            /// alphanumerics, `-`, `_` and `.` are accepted.
            pub fn parse(value: impl Into<String>) -> Result<Self, AppError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(AppError::validation(concat!(stringify!($name), " must not be empty")));
                }
                if value.len() > MAX_ID_LEN {
                    return Err(AppError::validation(format!(
                        "{} exceeds {} characters",
                        stringify!($name),
                        MAX_ID_LEN
                    )));
                }
                if value == "." || value == ".." {
                    return Err(AppError::validation(concat!(stringify!($name), " must not be a path segment")));
                }
                if !value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                {
                    return Err(AppError::validation(format!(
                        "{} contains invalid characters: '{}'",
                        stringify!($name),
                        value
                    )));
                }
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier, returning the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Identifier of one render job.
    JobId
);

define_string_id!(
    /// Opaque capability token granting download access to one cache entry.
    DownloadToken
);

impl JobId {
    /// Generate a fresh system identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl DownloadToken {
    /// Number of random bytes behind each token.
    pub const ENTROPY_BYTES: usize = 32;

    /// Generate a new unguessable token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}
