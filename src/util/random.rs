use crate::auth::pkce::Verifier;

/// Characters that cannot be confused with one another when read back:
/// no `0`/`O`/`o`, no `1`/`l`/`I`.
pub const UNAMBIGUOUS_ALPHANUMERIC: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789";

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for Verifier {
    fn from_random() -> Self {
        Verifier {
            value: random_string(Verifier::LENGTH),
        }
    }
}

pub fn random_string(size: usize) -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    (0..size)
        .map(|_| UNAMBIGUOUS_ALPHANUMERIC[rng.gen_range(0..UNAMBIGUOUS_ALPHANUMERIC.len())] as char)
        .collect()
}
