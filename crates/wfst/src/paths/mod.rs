// Path engine: bounded traversal of a graph producing accepted
// input/output string pairs.
//
// Both traversals (free extraction and input-driven lookup) walk the graph
// with an explicit DFS stack. Flag diacritics are checked with a
// copy-on-push stack of feature states, so backtracking over a flag is a pop.

mod ambiguity;
mod extract;
mod lookup;
mod options;

pub use ambiguity::{is_infinitely_ambiguous, is_lookup_infinitely_ambiguous};
pub use extract::{extract_paths, extract_paths_fd, extract_paths_with};
pub use lookup::{lookup, lookup_fd, lookup_with};
pub use options::{OutputFormat, PathOptions, Rendered, render};

use hashbrown::HashMap;
use wfst_core::flags::{FlagDiacriticTable, FlagState};
use wfst_core::weight::{self, Weight};
use wfst_core::{Symbol, SymbolPair};

use crate::graph::Transition;

/// One accepted path: its label sequence and total weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub pairs: Vec<SymbolPair>,
    pub weight: Weight,
}

impl Path {
    /// Input symbols without epsilons.
    pub fn input_symbols(&self) -> Vec<Symbol> {
        self.pairs
            .iter()
            .map(|p| p.0)
            .filter(|s| !s.is_epsilon())
            .collect()
    }

    /// Output symbols without epsilons.
    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.pairs
            .iter()
            .map(|p| p.1)
            .filter(|s| !s.is_epsilon())
            .collect()
    }

    pub fn input_string(&self) -> String {
        self.input_symbols().iter().map(|s| s.as_str()).collect()
    }

    pub fn output_string(&self) -> String {
        self.output_symbols().iter().map(|s| s.as_str()).collect()
    }
}

/// Copy-on-push flag state stack. Depth 0 is the neutral state.
pub(crate) struct FlagStack {
    table: FlagDiacriticTable,
    rows: Vec<FlagState>,
}

impl FlagStack {
    pub(crate) fn new(table: FlagDiacriticTable) -> Self {
        let neutral = table.initial_state();
        Self {
            table,
            rows: vec![neutral],
        }
    }

    /// The flag diacritic carried by `t`, if any.
    pub(crate) fn flag_of(&self, t: &Transition) -> Option<Symbol> {
        [t.input, t.output]
            .into_iter()
            .find(|&s| self.table.is_flag(s))
    }

    /// Copy the top row forward and apply `flag` to it. A rejected flag
    /// leaves the stack unchanged.
    pub(crate) fn push(&mut self, flag: Symbol) -> bool {
        let Some(fd) = self.table.get(flag).copied() else {
            return true;
        };
        let mut row = self.rows.last().cloned().unwrap_or_default();
        if row.apply(&fd) {
            self.rows.push(row);
            true
        } else {
            false
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn truncate(&mut self, depth: usize) {
        self.rows.truncate(depth.max(1));
    }
}

/// Distinct results keyed by their (input, output) strings, keeping the
/// lighter path.
#[derive(Default)]
pub(crate) struct ResultSet {
    index: HashMap<(String, String), usize>,
    paths: Vec<Path>,
}

impl ResultSet {
    pub(crate) fn insert(&mut self, path: Path) {
        let key = (path.input_string(), path.output_string());
        match self.index.get(&key) {
            Some(&i) => {
                if path.weight < self.paths[i].weight {
                    self.paths[i] = path;
                }
            }
            None => {
                self.index.insert(key, self.paths.len());
                self.paths.push(path);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.paths.len()
    }

    /// Results ordered by weight, ties broken by strings.
    pub(crate) fn into_sorted(self) -> Vec<Path> {
        let mut paths = self.paths;
        paths.sort_by(|a, b| {
            weight::compare(a.weight, b.weight)
                .then_with(|| a.input_string().cmp(&b.input_string()))
                .then_with(|| a.output_string().cmp(&b.output_string()))
        });
        paths
    }
}

/// Drop flag diacritics from a label sequence: a flag side becomes epsilon
/// and pairs that end up epsilon on both sides disappear.
pub(crate) fn strip_flags(pairs: &[SymbolPair], table: &FlagDiacriticTable) -> Vec<SymbolPair> {
    pairs
        .iter()
        .map(|&(i, o)| {
            let i = if table.is_flag(i) { Symbol::EPSILON } else { i };
            let o = if table.is_flag(o) { Symbol::EPSILON } else { o };
            (i, o)
        })
        .filter(|(i, o)| !(i.is_epsilon() && o.is_epsilon()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(name: &str) -> Symbol {
        Symbol::intern(name)
    }

    #[test]
    fn path_strings_skip_epsilon() {
        let p = Path {
            pairs: vec![(s("c"), s("c")), (s("a"), Symbol::EPSILON), (Symbol::EPSILON, s("t"))],
            weight: 1.0,
        };
        assert_eq!(p.input_string(), "ca");
        assert_eq!(p.output_string(), "ct");
    }

    #[test]
    fn flag_stack_copy_on_push() {
        let set = s("@P.CASE.NOM@");
        let require_gen = s("@R.CASE.GEN@");
        let table = FlagDiacriticTable::from_symbols([set, require_gen]).unwrap();
        let mut stack = FlagStack::new(table);
        assert!(stack.push(set));
        assert_eq!(stack.depth(), 2);
        assert!(!stack.push(require_gen));
        assert_eq!(stack.depth(), 2);
        stack.truncate(1);
        assert_eq!(stack.depth(), 1);
        stack.truncate(0);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn result_set_keeps_lighter_duplicate() {
        let mut set = ResultSet::default();
        let pairs = vec![(s("a"), s("b"))];
        set.insert(Path { pairs: pairs.clone(), weight: 2.0 });
        set.insert(Path { pairs: vec![(s("a"), s("b")), (Symbol::EPSILON, Symbol::EPSILON)], weight: 1.0 });
        set.insert(Path { pairs: vec![(s("z"), s("z"))], weight: 0.5 });
        assert_eq!(set.len(), 2);
        let sorted = set.into_sorted();
        assert_eq!(sorted[0].input_string(), "z");
        assert_eq!(sorted[1].weight, 1.0);
    }

    #[test]
    fn strip_flags_removes_flag_pairs() {
        let flag = s("@U.NUM.PL@");
        let table = FlagDiacriticTable::from_symbols([flag]).unwrap();
        let stripped = strip_flags(&[(s("a"), s("a")), (flag, flag), (flag, s("x"))], &table);
        assert_eq!(stripped, vec![(s("a"), s("a")), (Symbol::EPSILON, s("x"))]);
    }
}
