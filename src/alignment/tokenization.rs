use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::alignment::normalize::normalize_phonemes;
use crate::error::AlignmentError;
use crate::types::TokenSequence;

const EMBEDDED_TRANSITIONS: &str = include_str!("../../assets/phoneme_transitions.txt");

static DEFAULT_TABLE: OnceLock<Result<Arc<TransitionTable>, String>> = OnceLock::new();

/// Fixed bijection between ordered phoneme pairs and dense token ids.
///
/// Ids follow the order of the source table; the blank id is reserved right
/// after the last pair. Immutable once built.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    pairs: Vec<(String, String)>,
    index: HashMap<String, HashMap<String, usize>>,
}

/// The table embedded in the crate, parsed on first use and shared afterwards.
pub fn default_table() -> Result<Arc<TransitionTable>, AlignmentError> {
    DEFAULT_TABLE
        .get_or_init(|| {
            TransitionTable::parse(EMBEDDED_TRANSITIONS)
                .map(Arc::new)
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(|message| AlignmentError::Runtime {
            context: "embedded transition table",
            message,
        })
}

impl TransitionTable {
    pub fn from_pairs<I, A, B>(pairs: I) -> Result<Self, AlignmentError>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut table = Self {
            pairs: Vec::new(),
            index: HashMap::new(),
        };
        for (from, to) in pairs {
            table.push(from.into(), to.into())?;
        }
        if table.pairs.is_empty() {
            return Err(AlignmentError::runtime(
                "build transition table",
                "no transition pairs",
            ));
        }
        Ok(table)
    }

    /// Parse one pair per line, either `from->to` or `from to`. Blank lines and
    /// `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, AlignmentError> {
        let mut pairs = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_pair(line) {
                Some(pair) => pairs.push(pair),
                None => {
                    return Err(AlignmentError::runtime(
                        "parse transition table",
                        format!(
                            "line {}: expected `from->to` or `from to`, got {line:?}",
                            line_no + 1
                        ),
                    ))
                }
            }
        }
        Self::from_pairs(pairs)
    }

    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read transition table", e))?;
        Self::parse(&data)
    }

    fn push(&mut self, from: String, to: String) -> Result<(), AlignmentError> {
        let id = self.pairs.len();
        let targets = self.index.entry(from.clone()).or_default();
        if targets.contains_key(&to) {
            return Err(AlignmentError::runtime(
                "build transition table",
                format!("duplicate transition {from} -> {to}"),
            ));
        }
        targets.insert(to.clone(), id);
        self.pairs.push((from, to));
        Ok(())
    }

    /// Number of transition pairs, excluding blank.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Size of the full vocabulary including blank.
    pub fn vocab_size(&self) -> usize {
        self.pairs.len() + 1
    }

    pub fn blank_id(&self) -> usize {
        self.pairs.len()
    }

    pub fn id(&self, from: &str, to: &str) -> Option<usize> {
        self.index.get(from)?.get(to).copied()
    }

    pub fn pair(&self, id: usize) -> Option<(&str, &str)> {
        self.pairs
            .get(id)
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    pub fn encode<S: AsRef<str>>(&self, phonemes: &[S]) -> Result<Vec<usize>, AlignmentError> {
        phonemes
            .windows(2)
            .map(|w| {
                let (from, to) = (w[0].as_ref(), w[1].as_ref());
                self.id(from, to)
                    .ok_or_else(|| AlignmentError::undefined_transition(from, to))
            })
            .collect()
    }

    /// Rebuild the phoneme sequence: first token's source, then every target.
    pub fn decode(&self, ids: &[usize]) -> Result<Vec<String>, AlignmentError> {
        let Some(&first) = ids.first() else {
            return Ok(Vec::new());
        };
        let mut phonemes = Vec::with_capacity(ids.len() + 1);
        phonemes.push(self.checked_pair(first)?.0.to_string());
        for &id in ids {
            phonemes.push(self.checked_pair(id)?.1.to_string());
        }
        Ok(phonemes)
    }

    fn checked_pair(&self, id: usize) -> Result<(&str, &str), AlignmentError> {
        self.pair(id).ok_or_else(|| {
            AlignmentError::invalid_input(format!(
                "token id {id} is outside the transition vocabulary (size {})",
                self.len()
            ))
        })
    }
}

fn parse_pair(line: &str) -> Option<(&str, &str)> {
    let (from, to) = match line.split_once("->") {
        Some((from, to)) => (from.trim(), to.trim()),
        None => {
            let mut fields = line.split_whitespace();
            let pair = (fields.next()?, fields.next()?);
            if fields.next().is_some() {
                return None;
            }
            pair
        }
    };
    let is_symbol = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace);
    (is_symbol(from) && is_symbol(to)).then_some((from, to))
}

/// Normalize phoneme text and encode it against `table`.
pub fn build_token_sequence(
    text: &str,
    table: &TransitionTable,
) -> Result<TokenSequence, AlignmentError> {
    let phonemes = normalize_phonemes(text)?;
    let ids = table.encode(&phonemes)?;
    debug_assert_eq!(ids.len() + 1, phonemes.len());
    Ok(TokenSequence { ids, phonemes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<TransitionTable> {
        default_table().expect("embedded table parses")
    }

    fn seq(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn embedded_table_reserves_blank_after_pairs() {
        let table = table();
        assert_eq!(table.len(), 496);
        assert_eq!(table.blank_id(), 496);
        assert_eq!(table.vocab_size(), 497);
        assert!(table.pair(table.blank_id()).is_none());
    }

    #[test]
    fn default_table_is_shared() {
        let a = table();
        let b = table();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn encodes_reference_sequences() {
        let table = table();
        let cases: [(&str, &[usize]); 3] = [
            (
                "pau t a s u u k e ts u pau",
                &[484, 131, 190, 119, 257, 65, 310, 144, 387],
            ),
            ("pau i sh i k i pau", &[492, 230, 129, 366, 67, 374]),
            ("d o w a N g o", &[462, 20, 352, 154, 203, 394, 36, 361]),
        ];
        for (text, expected) in cases {
            let tokens = build_token_sequence(text, &table).unwrap();
            assert_eq!(tokens.ids, expected, "{text}");
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let table = table();
        for (text, expected) in [
            ("d o w a N g o", "pau d o w a N g o pau"),
            ("pau t a s u u k e ts u pau", "pau t a s u k e ts U pau"),
            ("i sh i k i pau", "pau i sh I k I pau"),
        ] {
            let tokens = build_token_sequence(text, &table).unwrap();
            let decoded = table.decode(&tokens.ids).unwrap();
            assert_eq!(decoded, seq(expected));
            assert_eq!(decoded, tokens.phonemes);
            assert_eq!(decoded.len(), tokens.ids.len() + 1);
        }
    }

    #[test]
    fn undefined_transition_reports_the_pair() {
        let table = table();
        let err = build_token_sequence("h o i n ky o m a", &table).unwrap_err();
        match err {
            AlignmentError::UndefinedTransition { from, to } => {
                assert_eq!(from, "n");
                assert_eq!(to, "ky");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn pause_never_precedes_a_voiceless_vowel() {
        let table = table();
        assert!(table.id("pau", "I").is_none());
        assert!(table.id("pau", "U").is_none());
        assert!(table.id("pau", "i").is_some());
        assert!(table.id("k", "I").is_some());
    }

    #[test]
    fn lone_pause_encodes_to_nothing() {
        let tokens = build_token_sequence("pau pau", &table()).unwrap();
        assert!(tokens.ids.is_empty());
        assert_eq!(tokens.phonemes, seq("pau"));
    }

    #[test]
    fn decode_rejects_blank_and_out_of_range_ids() {
        let table = table();
        assert!(table.decode(&[table.blank_id()]).is_err());
        assert!(table.decode(&[0, 10_000]).is_err());
        assert!(table.decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let table = TransitionTable::parse("# header\n\npau a\na pau\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.id("pau", "a"), Some(0));
        assert_eq!(table.id("a", "pau"), Some(1));
        assert_eq!(table.blank_id(), 2);
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert!(TransitionTable::parse("pau a extra\n").is_err());
        assert!(TransitionTable::parse("pau\n").is_err());
        assert!(TransitionTable::parse("# only comments\n").is_err());
        assert!(TransitionTable::parse("pau->\n").is_err());
        assert!(TransitionTable::parse("->a\n").is_err());
        assert!(TransitionTable::parse("pau->a b\n").is_err());
    }

    #[test]
    fn parse_accepts_arrow_keys() {
        let table = TransitionTable::parse("pau->t\nt->a\n a -> pau \n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.id("pau", "t"), Some(0));
        assert_eq!(table.id("t", "a"), Some(1));
        assert_eq!(table.id("a", "pau"), Some(2));
        assert_eq!(table.pair(1), Some(("t", "a")));
    }

    #[test]
    fn arrow_keyed_table_reproduces_reference_model_ids() {
        // Reference model layout: 558 `from->to` keys, ids by line number.
        let known: [(&str, usize); 15] = [
            ("pau->t", 546),
            ("t->a", 182),
            ("a->s", 222),
            ("s->u", 135),
            ("u->k", 292),
            ("k->e", 108),
            ("e->ts", 331),
            ("ts->U", 125),
            ("U->pau", 447),
            ("pau->i", 550),
            ("i->sh", 258),
            ("sh->I", 131),
            ("I->k", 403),
            ("k->I", 110),
            ("I->pau", 417),
        ];
        let mut lines: Vec<String> = (0..558).map(|n| format!("x{n}->y{n}")).collect();
        for (key, id) in known {
            lines[id] = key.to_string();
        }
        let table = TransitionTable::parse(&lines.join("\n")).unwrap();
        assert_eq!(table.len(), 558);
        assert_eq!(table.blank_id(), 558);

        let tokens = build_token_sequence("pau t a s u u k e ts u pau", &table).unwrap();
        assert_eq!(tokens.ids, [546, 182, 222, 135, 292, 108, 331, 125, 447]);
        let tokens = build_token_sequence("pau i sh i k i pau", &table).unwrap();
        assert_eq!(tokens.ids, [550, 258, 131, 403, 110, 417]);
    }

    #[test]
    fn duplicate_pairs_are_rejected() {
        let err = TransitionTable::from_pairs([("pau", "a"), ("a", "pau"), ("pau", "a")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate transition pau -> a"));
    }

    #[test]
    fn load_reads_table_from_disk() {
        let path = std::env::temp_dir().join("domino_rs_tokenization_table.txt");
        std::fs::write(&path, "pau k\nk a\na pau\n").expect("write table");
        let table = TransitionTable::load(&path).unwrap();
        assert_eq!(table.encode(&seq("pau k a pau")).unwrap(), vec![0, 1, 2]);
        let _ = std::fs::remove_file(&path);
    }
}
