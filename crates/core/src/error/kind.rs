use std::fmt;

use http::StatusCode;

/// An enum for the error kind.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
// Please keep the variants sorted alphabetically.
pub enum ErrorKind {
    /// `M_BAD_JSON`
    ///
    /// The request contained valid JSON, but it was malformed in some way, e.g.
    /// missing required keys, invalid values for keys.
    BadJson,

    /// Any errcode not listed here.
    Custom(String),

    /// `M_FORBIDDEN`
    Forbidden,

    /// `M_NOT_FOUND`
    NotFound,

    /// `M_NOT_JSON`
    NotJson,

    /// `UNAUTHORIZED`
    ///
    /// Server-server authentication failed. Sent with a 403 and without the
    /// `M_` namespace, which is what the servers under test match on.
    Unauthorized,

    /// `M_TOO_LARGE`
    ///
    /// The request body is over the size this server accepts.
    TooLarge,

    /// `M_UNKNOWN`
    Unknown,

    /// `M_UNRECOGNIZED`
    Unrecognized,
}

impl ErrorKind {
    pub fn errcode(&self) -> &str {
        match self {
            Self::BadJson => "M_BAD_JSON",
            Self::Custom(code) => code,
            Self::Forbidden => "M_FORBIDDEN",
            Self::NotFound => "M_NOT_FOUND",
            Self::NotJson => "M_NOT_JSON",
            Self::TooLarge => "M_TOO_LARGE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Unknown => "M_UNKNOWN",
            Self::Unrecognized => "M_UNRECOGNIZED",
        }
    }

    pub fn from_errcode(code: &str) -> Self {
        match code {
            "M_BAD_JSON" => Self::BadJson,
            "M_FORBIDDEN" => Self::Forbidden,
            "M_NOT_FOUND" => Self::NotFound,
            "M_NOT_JSON" => Self::NotJson,
            "M_TOO_LARGE" => Self::TooLarge,
            "UNAUTHORIZED" => Self::Unauthorized,
            "M_UNKNOWN" => Self::Unknown,
            "M_UNRECOGNIZED" => Self::Unrecognized,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Status used when the error does not carry one.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden | Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound | Self::Unrecognized => StatusCode::NOT_FOUND,
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadJson | Self::NotJson | Self::Custom(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.errcode())
    }
}
