//! A restricted, non-backtracking pattern language for string-shaped
//! variables — not a regex engine (see the crate's Non-goals).
//!
//! Patterns are matched and generated greedily: once a repeated character
//! set or a group has consumed input (or chosen a length during
//! generation), that choice is never revisited. Everything operates
//! byte-wise over the 0..=127 range; any byte outside that range (including
//! every continuation byte of a multi-byte UTF-8 sequence) is rejected the
//! same way the upstream engine rejects negative `char` values.

use std::fmt;

use crate::error::{Error, Result};
use crate::random::RandomEngine;

const SPECIAL_CHARACTERS: &[u8] = b"\\()[]{}^?*+-|";

fn is_non_negative_char(c: u8) -> bool {
    c <= 127
}

fn is_special_character(c: u8) -> bool {
    SPECIAL_CHARACTERS.contains(&c)
}

fn is_lower(c: u8) -> bool {
    c.is_ascii_lowercase()
}
fn is_upper(c: u8) -> bool {
    c.is_ascii_uppercase()
}
fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

/// `a <= b` and both are lowercase, both uppercase, or both digits.
fn valid_char_set_range(range: &[u8]) -> bool {
    if range.len() != 3 || range[1] != b'-' {
        return false;
    }
    let (a, b) = (range[0], range[2]);
    a <= b && ((is_lower(a) && is_lower(b)) || (is_upper(a) && is_upper(b)) || (is_digit(a) && is_digit(b)))
}

/// A set of valid characters plus a repetition count, e.g. the `[a-z]{2,4}`
/// piece of a pattern. By default accepts only the empty string.
#[derive(Debug, Clone)]
pub struct RepeatedCharSet {
    valid_chars: [bool; 128],
    min: i64,
    max: i64,
}

impl Default for RepeatedCharSet {
    fn default() -> Self {
        RepeatedCharSet { valid_chars: [false; 128], min: 0, max: 0 }
    }
}

impl RepeatedCharSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `character` to the valid set. Fails if it is already present or
    /// is outside `0..=127`.
    pub fn add(&mut self, character: u8) -> Result<()> {
        if !is_non_negative_char(character) {
            return Err(Error::invalid_argument("invalid character"));
        }
        if self.valid_chars[character as usize] {
            return Err(Error::invalid_argument(format!(
                "duplicate character: {}",
                character as char
            )));
        }
        self.valid_chars[character as usize] = true;
        Ok(())
    }

    /// Flips which characters are valid and invalid.
    pub fn flip_valid_characters(&mut self) {
        for v in &mut self.valid_chars {
            *v = !*v;
        }
    }

    /// Sets the repetition count to `[min, max]`.
    pub fn set_range(&mut self, min: i64, max: i64) -> Result<()> {
        if min > max || max < 0 {
            return Err(Error::invalid_argument("invalid repetition range"));
        }
        self.min = min.max(0);
        self.max = max;
        Ok(())
    }

    pub fn is_valid_character(&self, character: u8) -> bool {
        is_non_negative_char(character) && self.valid_chars[character as usize]
    }

    /// Whether `str` (taken whole) is a valid repetition of this set.
    pub fn is_valid(&self, s: &[u8]) -> Result<()> {
        let len = s.len() as i64;
        if len < self.min {
            return Err(Error::invalid_argument("string's length is too small"));
        }
        if len > self.max {
            return Err(Error::invalid_argument("string's length is too large"));
        }
        for &c in s {
            if !self.is_valid_character(c) {
                return Err(Error::invalid_argument("invalid character"));
            }
        }
        Ok(())
    }

    /// The length of the longest prefix of `s` made entirely of valid
    /// characters, capped at `max`. Fails if that prefix is shorter than
    /// `min`.
    pub fn longest_valid_prefix(&self, s: &[u8]) -> Result<i64> {
        let mut idx: i64 = 0;
        while idx < s.len() as i64 && idx < self.max {
            if !self.is_valid_character(s[idx as usize]) {
                break;
            }
            idx += 1;
        }
        if idx < self.min {
            return Err(Error::invalid_argument("string's length is too small"));
        }
        Ok(idx)
    }

    pub fn min_length(&self) -> i64 {
        self.min
    }

    pub fn max_length(&self) -> i64 {
        self.max
    }

    pub fn valid_characters(&self) -> Vec<u8> {
        (0u8..128).filter(|&c| self.valid_chars[c as usize]).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubpatternType {
    AllOf,
    AnyOf,
}

/// One node of a parsed pattern: a repeated character set, followed by
/// either an ordered concatenation (`AllOf`) or a left-to-right choice
/// (`AnyOf`) of child nodes.
#[derive(Debug, Clone)]
struct PatternNode {
    repeated_character_set: RepeatedCharSet,
    subpattern_type: SubpatternType,
    subpatterns: Vec<PatternNode>,
    pattern: Vec<u8>,
}

impl PatternNode {
    fn leaf(repeated_character_set: RepeatedCharSet, pattern: Vec<u8>) -> Self {
        PatternNode {
            repeated_character_set,
            subpattern_type: SubpatternType::AllOf,
            subpatterns: Vec::new(),
            pattern,
        }
    }
}

struct RepetitionRange {
    min_length: i64,
    max_length: i64,
}

/// Length of the prefix of `pattern` that forms a character-set token: a
/// single non-special byte, or a bracketed `[...]` class.
fn character_set_prefix_length(pattern: &[u8]) -> Result<usize> {
    if pattern.is_empty() {
        return Err(Error::invalid_argument("empty pattern"));
    }
    if pattern[0] != b'[' {
        if is_special_character(pattern[0]) {
            return Err(Error::invalid_argument("invalid character to start character set"));
        }
        return Ok(1);
    }

    // The set ends at the first ']', unless a second '[' appears before it,
    // in which case it ends at the second ']'.
    let mut close_index: Option<usize> = None;
    let mut i = 1;
    while i < pattern.len() {
        if pattern[i] == b']' {
            if close_index.is_some() {
                close_index = Some(i);
                break;
            }
            close_index = Some(i);
        } else if pattern[i] == b'[' && close_index.is_some() {
            break;
        }
        i += 1;
    }

    match close_index {
        Some(idx) => Ok(idx + 1),
        None => Err(Error::invalid_argument("no ']' found to end character set")),
    }
}

/// Parses the body of a character set (without the surrounding `[]`, if
/// any). The returned set's repetition is fixed to `{1,1}`; callers apply
/// the real repetition afterwards.
fn parse_character_set_body(chars: &[u8]) -> Result<RepeatedCharSet> {
    if chars.is_empty() {
        return Err(Error::invalid_argument("empty character set"));
    }

    let mut char_set = RepeatedCharSet::new();
    char_set.set_range(1, 1)?;

    let mut chars = chars;
    let mut negation = false;
    if chars[0] == b'^' {
        chars = &chars[1..];
        if chars.is_empty() {
            char_set.add(b'^')?;
            return Ok(char_set);
        }
        negation = true;
    }

    let mut trailing_dash = false;
    if *chars.last().unwrap() == b'-' {
        trailing_dash = true;
        chars = &chars[..chars.len() - 1];
    }

    let has_open = chars.contains(&b'[');
    let has_close = chars.contains(&b']');
    if has_open && has_close {
        let open = chars.iter().position(|&c| c == b'[').unwrap();
        let close = chars.iter().position(|&c| c == b']').unwrap();
        if open > close {
            return Err(Error::invalid_argument(
                "the character ']' cannot come after '[' inside a character set",
            ));
        }
    }

    let mut i = 0;
    while i < chars.len() {
        if i + 3 <= chars.len() && valid_char_set_range(&chars[i..i + 3]) {
            for c in chars[i]..=chars[i + 2] {
                char_set.add(c)?;
            }
            i += 3;
            continue;
        }
        if chars[i] == b'-' {
            return Err(Error::invalid_argument("invalid '-' in character set"));
        }
        char_set.add(chars[i])?;
        i += 1;
    }

    if trailing_dash {
        char_set.add(b'-')?;
    }

    if negation {
        char_set.flip_valid_characters();
    }

    Ok(char_set)
}

/// Length of the prefix of `pattern` that forms a repetition suffix
/// (`?`, `+`, `*`, or a `{...}` block). Zero if `pattern` has none.
fn repetition_prefix_length(pattern: &[u8]) -> Result<usize> {
    if pattern.is_empty() {
        return Ok(0);
    }
    if matches!(pattern[0], b'?' | b'+' | b'*') {
        return Ok(1);
    }
    if pattern[0] != b'{' {
        return Ok(0);
    }
    match pattern.iter().position(|&c| c == b'}') {
        Some(idx) => Ok(idx + 1),
        None => Err(Error::invalid_argument("no '}' found to end repetition block")),
    }
}

fn parse_repetition_body(repetition: &[u8]) -> Result<RepetitionRange> {
    if repetition.is_empty() {
        return Ok(RepetitionRange { min_length: 1, max_length: 1 });
    }
    if repetition.len() == 1 {
        return match repetition[0] {
            b'?' => Ok(RepetitionRange { min_length: 0, max_length: 1 }),
            b'+' => Ok(RepetitionRange { min_length: 1, max_length: i64::MAX }),
            b'*' => Ok(RepetitionRange { min_length: 0, max_length: i64::MAX }),
            _ => Err(Error::invalid_argument("invalid repetition block")),
        };
    }

    if repetition[0] != b'{' || repetition[repetition.len() - 1] != b'}' {
        return Err(Error::invalid_argument("invalid repetition block"));
    }
    let body = &repetition[1..repetition.len() - 1];

    let (min_str, max_str): (&[u8], &[u8]) = match body.iter().position(|&c| c == b',') {
        Some(comma) => (&body[..comma], &body[comma + 1..]),
        None => (body, body),
    };

    let parse_i64 = |bytes: &[u8]| -> Result<i64> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| Error::invalid_argument("invalid value in repetition"))
    };

    let mut result = RepetitionRange { min_length: 0, max_length: i64::MAX };
    if !min_str.is_empty() {
        result.min_length = parse_i64(min_str)?;
    }
    if !max_str.is_empty() {
        result.max_length = parse_i64(max_str)?;
    }
    Ok(result)
}

/// Parses the prefix of `pattern` that forms one repeated character set,
/// e.g. `"a*"` out of `"a*b"`, `"[ab]{1,2}"` out of `"[ab]{1,2}c"`.
fn parse_repeated_char_set_prefix(pattern: &[u8]) -> Result<PatternNode> {
    let char_set_len = character_set_prefix_length(pattern)?;
    let mut chars = &pattern[..char_set_len];
    if chars.len() >= 2 && chars[0] == b'[' && chars[chars.len() - 1] == b']' {
        chars = &chars[1..chars.len() - 1];
    }
    let mut char_set = parse_character_set_body(chars)?;

    let repetition_len = repetition_prefix_length(&pattern[char_set_len..])?;
    let repetition = parse_repetition_body(&pattern[char_set_len..char_set_len + repetition_len])?;
    char_set.set_range(repetition.min_length, repetition.max_length)?;

    let total = char_set_len + repetition_len;
    Ok(PatternNode::leaf(char_set, pattern[..total].to_vec()))
}

/// Parses a concatenation of char-sets and groups up to the first `|` or
/// `)` (or end of input).
fn parse_allof_node_scope_prefix(pattern: &[u8]) -> Result<PatternNode> {
    let mut subpatterns = Vec::new();
    let mut idx = 0;
    while idx < pattern.len() && pattern[idx] != b'|' && pattern[idx] != b')' {
        if pattern[idx] != b'(' {
            let node = parse_repeated_char_set_prefix(&pattern[idx..])?;
            idx += node.pattern.len();
            subpatterns.push(node);
            continue;
        }

        let mut inner = parse_scope_prefix(&pattern[idx + 1..])?;
        let inner_len = inner.pattern.len();
        if idx + 1 + inner_len >= pattern.len() || pattern[idx + 1 + inner_len] != b')' {
            return Err(Error::invalid_argument("invalid end of scope, expected ')'"));
        }
        inner.pattern = pattern[idx..idx + inner_len + 2].to_vec();
        subpatterns.push(inner);
        idx += inner_len + 2;
    }

    Ok(PatternNode {
        repeated_character_set: RepeatedCharSet::new(),
        subpattern_type: SubpatternType::AllOf,
        subpatterns,
        pattern: pattern[..idx].to_vec(),
    })
}

/// Strips escape sequences (`\\` -> `\`, `\ ` -> ` `) and unescaped spaces.
fn sanitize(pattern: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(pattern.len());
    let mut i = 0;
    while i < pattern.len() {
        if pattern[i] == b'\\' {
            if i + 1 == pattern.len() {
                return Err(Error::invalid_argument(
                    "cannot have unescaped '\\' at the end of pattern",
                ));
            }
            let next = pattern[i + 1];
            if next != b'\\' && next != b' ' {
                return Err(Error::invalid_argument(format!(
                    "invalid escaped character in pattern: '\\{}'",
                    next as char
                )));
            }
            out.push(next);
            i += 2;
            continue;
        }
        if pattern[i] != b' ' {
            out.push(pattern[i]);
        }
        i += 1;
    }
    Ok(out)
}

/// Parses the prefix of `pattern` that forms one scope: an or-expression
/// of concatenations, ending at end-of-input or at the first unmatched
/// `)`. A single-alternative or-expression is flattened away.
fn parse_scope_prefix(pattern: &[u8]) -> Result<PatternNode> {
    if pattern.is_empty() || pattern[0] == b')' {
        return Err(Error::invalid_argument("empty scope"));
    }

    let mut subpatterns = Vec::new();
    let mut idx = 0;
    while idx < pattern.len() && pattern[idx] != b')' {
        if pattern[idx] == b'|' {
            if idx == 0 || idx + 1 >= pattern.len() || pattern[idx + 1] == b'|' {
                return Err(Error::invalid_argument("empty or-block not allowed"));
            }
            idx += 1;
        }
        let node = parse_allof_node_scope_prefix(&pattern[idx..])?;
        idx += node.pattern.len();
        subpatterns.push(node);
    }

    if subpatterns.len() == 1 {
        return Ok(subpatterns.into_iter().next().unwrap());
    }

    Ok(PatternNode {
        repeated_character_set: RepeatedCharSet::new(),
        subpattern_type: SubpatternType::AnyOf,
        subpatterns,
        pattern: pattern[..idx].to_vec(),
    })
}

fn matches_prefix_length(node: &PatternNode, s: &[u8]) -> Result<i64> {
    let mut prefix_length = node.repeated_character_set.longest_valid_prefix(s)?;
    let mut rest = &s[prefix_length as usize..];

    for subpattern in &node.subpatterns {
        match matches_prefix_length(subpattern, rest) {
            Ok(sub_len) => {
                prefix_length += sub_len;
                if node.subpattern_type == SubpatternType::AnyOf {
                    return Ok(prefix_length);
                }
                rest = &rest[sub_len as usize..];
            }
            Err(err) => {
                if node.subpattern_type == SubpatternType::AllOf {
                    return Err(err);
                }
                // AnyOf: this alternative didn't match, try the next one.
            }
        }
    }

    if node.subpattern_type == SubpatternType::AnyOf {
        return Err(Error::invalid_argument("no alternative matched"));
    }
    Ok(prefix_length)
}

fn generate_repeated_char_set(
    char_set: &RepeatedCharSet,
    restricted_alphabet: Option<&[u8]>,
    random_engine: &mut RandomEngine,
) -> Result<Vec<u8>> {
    if char_set.max_length() == i64::MAX {
        return Err(Error::invalid_argument("cannot generate with '*' or '+' or unbounded lengths"));
    }
    let len = random_engine.rand_int(char_set.min_length(), char_set.max_length())?;

    let mut restricted = RepeatedCharSet::new();
    match restricted_alphabet {
        Some(alphabet) => {
            for &c in alphabet {
                let _ = restricted.add(c);
            }
        }
        None => restricted.flip_valid_characters(),
    }

    let valid_chars: Vec<u8> = char_set
        .valid_characters()
        .into_iter()
        .filter(|&c| restricted.is_valid_character(c))
        .collect();

    if valid_chars.is_empty() {
        if char_set.min_length() <= 0 {
            return Ok(Vec::new());
        }
        return Err(Error::invalid_argument(
            "no valid characters for generation, but empty string is not allowed",
        ));
    }

    random_engine.random_elements_with_replacement(&valid_chars, len as usize)
}

fn generate_pattern_node(
    node: &PatternNode,
    restricted_alphabet: Option<&[u8]>,
    random_engine: &mut RandomEngine,
) -> Result<Vec<u8>> {
    let mut result = generate_repeated_char_set(&node.repeated_character_set, restricted_alphabet, random_engine)?;

    if node.subpatterns.is_empty() {
        return Ok(result);
    }

    if node.subpattern_type == SubpatternType::AnyOf {
        let idx = random_engine.rand_below(node.subpatterns.len() as i64)? as usize;
        let sub = generate_pattern_node(&node.subpatterns[idx], restricted_alphabet, random_engine)?;
        result.extend(sub);
        return Ok(result);
    }

    for subpattern in &node.subpatterns {
        let sub = generate_pattern_node(subpattern, restricted_alphabet, random_engine)?;
        result.extend(sub);
    }
    Ok(result)
}

/// A parsed, restricted pattern: greedy, non-backtracking, not a regex
/// engine.
#[derive(Debug, Clone)]
pub struct SimplePattern {
    pattern: String,
    root: PatternNode,
}

impl SimplePattern {
    /// Parses `pattern`. Fails with `Error::InvalidArgument` on malformed
    /// syntax or on any byte outside `0..=127`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let sanitized = sanitize(pattern.as_bytes())?;
        if sanitized.is_empty() {
            return Err(Error::invalid_argument("empty pattern"));
        }
        let root = parse_scope_prefix(&sanitized)?;
        if root.pattern != sanitized {
            return Err(Error::invalid_argument("invalid pattern: extra characters found"));
        }
        let pattern = String::from_utf8(sanitized)
            .map_err(|_| Error::internal("sanitized pattern was not valid UTF-8"))?;
        Ok(SimplePattern { pattern, root })
    }

    /// The sanitized pattern text (escapes resolved, whitespace removed).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `s` matches the pattern exactly, greedily and without
    /// backtracking.
    pub fn matches(&self, s: &str) -> bool {
        match matches_prefix_length(&self.root, s.as_bytes()) {
            Ok(len) => len as usize == s.len(),
            Err(_) => false,
        }
    }

    /// Generates a string matching the pattern. Fails if the pattern
    /// contains an unbounded repetition (`*`, `+`, or a `{n,}` block).
    pub fn generate(&self, random_engine: &mut RandomEngine) -> Result<String> {
        self.generate_with_restrictions(None, random_engine)
    }

    /// Same as `generate`, but every generated character is drawn only from
    /// `restricted_alphabet` when one is given.
    pub fn generate_with_restrictions(
        &self,
        restricted_alphabet: Option<&str>,
        random_engine: &mut RandomEngine,
    ) -> Result<String> {
        let bytes = generate_pattern_node(&self.root, restricted_alphabet.map(str::as_bytes), random_engine)?;
        String::from_utf8(bytes).map_err(|_| Error::internal("generated non-UTF-8 bytes"))
    }
}

impl fmt::Display for SimplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_character() {
        let p = SimplePattern::parse("abc").unwrap();
        assert!(p.matches("abc"));
        assert!(!p.matches("abd"));
    }

    #[test]
    fn character_class_and_star() {
        let p = SimplePattern::parse("[abc]*").unwrap();
        assert!(p.matches(""));
        assert!(p.matches("aaa"));
        assert!(p.matches("accb"));
        assert!(!p.matches("accd"));
    }

    #[test]
    fn negated_class() {
        let p = SimplePattern::parse("[^abc]").unwrap();
        assert!(p.matches("d"));
        assert!(!p.matches("a"));
    }

    #[test]
    fn range_in_class() {
        let p = SimplePattern::parse("[a-z0-9]+").unwrap();
        assert!(p.matches("hello123"));
        assert!(!p.matches("Hello"));
    }

    #[test]
    fn trailing_dash_is_literal() {
        let p = SimplePattern::parse("[+-]?[0-9]+").unwrap();
        assert!(p.matches("-5"));
        assert!(p.matches("+5"));
        assert!(p.matches("5"));
    }

    #[test]
    fn or_expression() {
        let p = SimplePattern::parse("hello|world").unwrap();
        assert!(p.matches("hello"));
        assert!(p.matches("world"));
        assert!(!p.matches("helloworld"));
    }

    #[test]
    fn greedy_without_backtracking_fails_adjacent_literal() {
        // "a*a" can never match, since the `a*` greedily consumes everything.
        let p = SimplePattern::parse("a*a").unwrap();
        assert!(!p.matches("aaaa"));
    }

    #[test]
    fn repetition_bounds() {
        let p = SimplePattern::parse("a{2,3}").unwrap();
        assert!(!p.matches("a"));
        assert!(p.matches("aa"));
        assert!(p.matches("aaa"));
        assert!(!p.matches("aaaa"));
    }

    #[test]
    fn groups_recurse_but_cannot_repeat() {
        assert!(SimplePattern::parse("((hello|bye)world)").is_ok());
        assert!(SimplePattern::parse("(ab)*").is_err());
    }

    #[test]
    fn escaped_special_characters() {
        let p = SimplePattern::parse(r"[(]a*[)]").unwrap();
        assert!(p.matches("(aaa)"));
    }

    #[test]
    fn whitespace_is_ignored_outside_escapes() {
        let p = SimplePattern::parse("a b  c").unwrap();
        assert!(p.matches("abc"));
    }

    #[test]
    fn generation_round_trips_through_matches() {
        let p = SimplePattern::parse("[a-c]{3,5}").unwrap();
        let mut engine = RandomEngine::new(&[1, 2, 3]);
        for _ in 0..50 {
            let s = p.generate(&mut engine).unwrap();
            assert!(p.matches(&s), "generated {s:?} does not match its own pattern");
        }
    }

    #[test]
    fn unbounded_repetition_cannot_generate() {
        let p = SimplePattern::parse("a*").unwrap();
        let mut engine = RandomEngine::new(&[1]);
        assert!(p.generate(&mut engine).is_err());
    }

    #[test]
    fn restricted_alphabet_limits_generated_characters() {
        let p = SimplePattern::parse("[a-z]{5,5}").unwrap();
        let mut engine = RandomEngine::new(&[7]);
        let s = p.generate_with_restrictions(Some("abc"), &mut engine).unwrap();
        assert!(s.chars().all(|c| "abc".contains(c)));
    }
}
