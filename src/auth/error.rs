#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The user could not be sent to the authorization endpoint, or came back
    /// with an error instead of a code.
    Redirect(String),
    /// No verifier survived the redirect round-trip.
    MissingVerifier,
    /// `status` is `None` when no response arrived at all.
    TokenExchange { status: Option<u16>, reason: String },
    Store(String),
}

impl Error {
    pub fn exchange_status(&self) -> Option<u16> {
        match self {
            Self::TokenExchange { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<crate::provider::Error> for Error {
    fn from(e: crate::provider::Error) -> Self {
        Self::TokenExchange {
            status: e.status(),
            reason: e.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<crate::navigation::Error> for Error {
    fn from(e: crate::navigation::Error) -> Self {
        Self::Redirect(e.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect(reason) => write!(f, "authorization failed: {}", reason),
            Self::MissingVerifier => write!(f, "authorization failed: login was not started from this app"),
            Self::TokenExchange { status: Some(status), .. } => {
                write!(f, "authentication failed (HTTP {})", status)
            }
            Self::TokenExchange { status: None, reason } => write!(f, "authentication failed: {}", reason),
            Self::Store(reason) => write!(f, "could not keep login state: {}", reason),
        }
    }
}

impl std::error::Error for Error {}
