use base64::Engine;
use sha2::Digest;

use crate::util::random::FromRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize)]
pub enum Transformation {
    S256,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::S256
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize)]
pub struct Challenge {
    #[serde(rename = "code_challenge")]
    pub code: String,
    #[serde(rename = "code_challenge_method")]
    pub method: Transformation,
}

impl Challenge {
    /// base64url (no padding) of the SHA-256 digest of the verifier.
    pub fn from_verifier(verifier: &Verifier) -> Self {
        let digest = sha2::Sha256::digest(verifier.value.as_bytes());
        let code = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);
        Self {
            code,
            method: Transformation::S256,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Verifier {
    #[serde(rename = "code_verifier")]
    pub value: String,
}

impl Verifier {
    pub const LENGTH: usize = 64;

    pub fn generate() -> Self {
        Self::from_random()
    }

    pub fn from_persisted(value: String) -> Self {
        Self { value }
    }

    pub fn challenge(&self) -> Challenge {
        Challenge::from_verifier(self)
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Verifier {{ ... }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc7636_appendix_b() {
        let verifier = Verifier::from_persisted("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(
            verifier.challenge().code,
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn challenge_is_deterministic_and_url_safe() {
        let verifier = Verifier::generate();
        assert_eq!(verifier.value.len(), Verifier::LENGTH);

        let first = verifier.challenge();
        let again = Challenge::from_verifier(&Verifier::from_persisted(verifier.value.clone()));
        assert_eq!(first, again);
        assert_eq!(first.method, Transformation::S256);
        assert!(!first.code.contains('='));
        assert!(!first.code.contains('+'));
        assert!(!first.code.contains('/'));
        // 32 digest bytes, unpadded
        assert_eq!(first.code.len(), 43);
    }

    #[test]
    fn fresh_verifiers_give_fresh_challenges() {
        assert_ne!(Verifier::generate().challenge(), Verifier::generate().challenge());
    }
}
