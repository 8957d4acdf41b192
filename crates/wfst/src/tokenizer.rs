// Longest-match string tokenizer for building transducers from text.

use hashbrown::HashSet;
use wfst_core::{Symbol, SymbolPair};

/// Splits strings into symbols, one character each unless a registered
/// multicharacter symbol matches.
///
/// Matching is left to right and takes the longest registered symbol at each
/// position. Skip symbols take part in the match but are dropped from the
/// output.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    multichar: HashSet<String>,
    skip: HashSet<String>,
    /// Longest registered symbol, in characters.
    longest: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_multichar_symbol(&mut self, symbol: &str) {
        self.note_length(symbol);
        self.multichar.insert(symbol.to_string());
    }

    pub fn add_skip_symbol(&mut self, symbol: &str) {
        self.note_length(symbol);
        self.skip.insert(symbol.to_string());
    }

    fn note_length(&mut self, symbol: &str) {
        self.longest = self.longest.max(symbol.chars().count());
    }

    /// Tokens of `input`, skip symbols removed.
    pub fn tokenize_one_level(&self, input: &str) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            let (token, skipped) = self.next_token(rest);
            if !skipped {
                symbols.push(Symbol::intern(token));
            }
            rest = &rest[token.len()..];
        }
        symbols
    }

    /// Identity pairs for the tokens of `input`.
    pub fn tokenize(&self, input: &str) -> Vec<SymbolPair> {
        self.tokenize_one_level(input)
            .into_iter()
            .map(|s| (s, s))
            .collect()
    }

    /// Pair up the tokens of `input` and `output`, padding the shorter side
    /// with epsilons at the end.
    pub fn tokenize_pair(&self, input: &str, output: &str) -> Vec<SymbolPair> {
        let upper = self.tokenize_one_level(input);
        let lower = self.tokenize_one_level(output);
        let len = upper.len().max(lower.len());
        (0..len)
            .map(|i| {
                (
                    upper.get(i).copied().unwrap_or(Symbol::EPSILON),
                    lower.get(i).copied().unwrap_or(Symbol::EPSILON),
                )
            })
            .collect()
    }

    /// The token at the start of `text` and whether it is a skip symbol.
    fn next_token<'a>(&self, text: &'a str) -> (&'a str, bool) {
        let ends: Vec<usize> = text
            .char_indices()
            .skip(1)
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .take(self.longest.max(1))
            .collect();
        for &end in ends.iter().rev() {
            let candidate = &text[..end];
            if self.skip.contains(candidate) {
                return (candidate, true);
            }
            if self.multichar.contains(candidate) {
                return (candidate, false);
            }
        }
        (&text[..ends[0]], false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(symbols: &[Symbol]) -> Vec<&'static str> {
        symbols.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn single_characters_by_default() {
        let tok = Tokenizer::new();
        assert_eq!(names(&tok.tokenize_one_level("käsi")), vec!["k", "ä", "s", "i"]);
        assert!(tok.tokenize_one_level("").is_empty());
    }

    #[test]
    fn longest_match_and_skip() {
        let mut tok = Tokenizer::new();
        tok.add_multichar_symbol("<br />");
        tok.add_skip_symbol("<p>");
        tok.add_skip_symbol("</p>");
        let symbols = tok.tokenize_one_level("<p>A<br />pa!</p>");
        assert_eq!(names(&symbols), vec!["A", "<br />", "p", "a", "!"]);
    }

    #[test]
    fn longer_skip_beats_shorter_multichar() {
        let mut tok = Tokenizer::new();
        tok.add_multichar_symbol("fo");
        tok.add_skip_symbol("foo");
        assert!(tok.tokenize_one_level("foo").is_empty());

        let mut tok = Tokenizer::new();
        tok.add_multichar_symbol("foo");
        tok.add_skip_symbol("fo");
        assert_eq!(names(&tok.tokenize_one_level("foo")), vec!["foo"]);
    }

    #[test]
    fn pair_pads_with_epsilon() {
        let mut tok = Tokenizer::new();
        tok.add_multichar_symbol("+N");
        let pairs = tok.tokenize_pair("cat+N", "cats");
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3], (Symbol::intern("+N"), Symbol::intern("s")));

        let pairs = tok.tokenize_pair("ab", "");
        assert_eq!(pairs, vec![(Symbol::intern("a"), Symbol::EPSILON), (Symbol::intern("b"), Symbol::EPSILON)]);
    }
}
