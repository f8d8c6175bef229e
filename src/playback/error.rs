#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    MissingToken,
    NoDevice,
}

#[derive(Debug)]
pub enum Error {
    /// Nothing was sent: the session lacks a token or a ready device.
    Precondition(Precondition),
    Initialization(String),
    Request(crate::provider::Error),
}

impl Error {
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

impl From<Precondition> for Error {
    fn from(p: Precondition) -> Self {
        Self::Precondition(p)
    }
}

impl From<crate::provider::Error> for Error {
    fn from(e: crate::provider::Error) -> Self {
        Self::Request(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Precondition(Precondition::MissingToken) => write!(f, "not logged in"),
            Self::Precondition(Precondition::NoDevice) => write!(f, "player is not ready yet"),
            Self::Initialization(reason) => write!(f, "player could not start: {}", reason),
            // 403 is what the provider answers for accounts without premium
            Self::Request(e) if e.status() == Some(403) => {
                write!(f, "playback refused ({}); a premium account is required", e)
            }
            Self::Request(e) => write!(f, "playback failed: {}", e),
        }
    }
}

impl std::error::Error for Error {}
