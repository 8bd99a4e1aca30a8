use rand::{Rng, distributions::Alphanumeric};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random `[A-Za-z0-9]` string, used for ICE credentials and ids.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random lowercase base-36 string.
#[must_use]
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect()
}

#[must_use]
pub fn random_u64() -> u64 {
    rand::thread_rng().r#gen()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_strings_use_expected_alphabets() {
        let a = random_alphanumeric(16);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));

        let b = random_base36(10);
        assert_eq!(b.len(), 10);
        assert!(b.chars().all(|c| matches!(c, '0'..='9' | 'a'..='z')));
    }
}
