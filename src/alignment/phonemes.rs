//! Phoneme symbols the normalizer and label assembler agree on.

pub const PAUSE: &str = "pau";

/// Voiceless consonants that can devoice a following `i`/`u`.
pub const DEVOICING_TRIGGERS: [&str; 12] = [
    "k", "ky", "ch", "ts", "sh", "s", "hy", "h", "f", "py", "p", "t",
];

pub fn is_devoicing_trigger(phoneme: &str) -> bool {
    DEVOICING_TRIGGERS.contains(&phoneme)
}

/// Right context of a devoiced vowel: a trigger consonant or a pause.
pub fn is_devoicing_follower(phoneme: &str) -> bool {
    phoneme == PAUSE || is_devoicing_trigger(phoneme)
}

pub fn devoiced(vowel: &str) -> Option<&'static str> {
    match vowel {
        "i" => Some("I"),
        "u" => Some("U"),
        _ => None,
    }
}

pub fn voiced(vowel: &str) -> Option<&'static str> {
    match vowel {
        "I" => Some("i"),
        "U" => Some("u"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_follows_but_does_not_trigger() {
        assert!(!is_devoicing_trigger(PAUSE));
        assert!(is_devoicing_follower(PAUSE));
        assert!(is_devoicing_follower("ts"));
        assert!(!is_devoicing_follower("g"));
    }

    #[test]
    fn voicing_maps_are_inverse() {
        for vowel in ["i", "u"] {
            let unvoiced = devoiced(vowel).expect("devoicable vowel");
            assert_eq!(voiced(unvoiced), Some(vowel));
        }
        assert_eq!(devoiced("a"), None);
        assert_eq!(voiced("a"), None);
    }
}
