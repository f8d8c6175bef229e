#[derive(Debug)]
pub enum Error {
    /// The provider answered with a non-success status.
    Status(u16),
    Http(reqwest::Error),
    Url(url::ParseError),
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(status) => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Url(_) => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::Url(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "provider responded with HTTP {}", status),
            Self::Http(e) => write!(f, "request to provider failed: {}", e),
            Self::Url(e) => write!(f, "bad provider endpoint: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Url(e) => Some(e),
            Self::Status(_) => None,
        }
    }
}
