use crate::{constants::SHORT_LINK_ALPHABET, schema::Id};

/// Base-62 code of a recipe id.
pub fn encode_short_code(id: Id) -> String {
    let base = SHORT_LINK_ALPHABET.len() as u64;
    let mut value = u64::from(id.unsigned_abs());
    let mut digits = Vec::new();

    loop {
        digits.push(SHORT_LINK_ALPHABET[(value % base) as usize]);
        value /= base;
        if value == 0 {
            break;
        }
    }

    digits.iter().rev().map(|b| *b as char).collect()
}

pub fn decode_short_code(code: &str) -> Option<Id> {
    if code.is_empty() {
        return None;
    }

    let base = SHORT_LINK_ALPHABET.len() as u64;
    let value = code.bytes().try_fold(0u64, |acc, b| {
        let digit = SHORT_LINK_ALPHABET.iter().position(|c| *c == b)? as u64;
        acc.checked_mul(base)?.checked_add(digit)
    })?;

    Id::try_from(value).ok()
}

pub fn short_link(public_url: &str, id: Id) -> String {
    format!(
        "{}/s/{}",
        public_url.trim_end_matches('/'),
        encode_short_code(id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_decode_to_the_same_id() {
        for id in [0, 1, 61, 62, 3_843, 1_000_000, Id::MAX] {
            assert_eq!(decode_short_code(&encode_short_code(id)), Some(id));
        }
    }

    #[test]
    fn small_ids_give_short_codes() {
        assert_eq!(encode_short_code(10), "a");
        assert_eq!(encode_short_code(62), "10");
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(decode_short_code(""), None);
        assert_eq!(decode_short_code("ab-c"), None);
        assert_eq!(decode_short_code("zzzzzzzzzzzz"), None);
    }

    #[test]
    fn link_joins_public_url() {
        assert_eq!(short_link("http://localhost:8000/", 62), "http://localhost:8000/s/10");
    }
}
