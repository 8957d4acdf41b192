use wfst_core::FstError;
use wfst_core::StateId;
use wfst_core::flags::FlagDiacriticTable;
use wfst_core::weight::{self, Weight};

use super::{FlagStack, Path, PathOptions, ResultSet, strip_flags};
use crate::graph::{INITIAL_STATE, TransitionGraph};
use crate::topology;

/// One DFS frame. `pairs_len` and `flag_depth` record the shared stacks'
/// sizes when the frame was entered, so popping restores them.
struct Frame {
    state: StateId,
    next: usize,
    weight: Weight,
    pairs_len: usize,
    flag_depth: usize,
}

/// Extraction limits. `max_num <= 0` means no limit on the number of
/// results, `cycles < 0` means no limit on cycle traversals.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    max_num: i32,
    cycles: i32,
}

/// Every accepted path, with flag diacritics treated as ordinary symbols.
///
/// A state may be entered at most `cycles + 1` times on one path. Fails with
/// `CyclicTransducer` when both bounds are unlimited and the graph is cyclic.
pub fn extract_paths(graph: &TransitionGraph, max_num: i32, cycles: i32) -> Result<Vec<Path>, FstError> {
    extract(graph, Bounds { max_num, cycles }, None, false)
}

/// Like [`extract_paths`], but flag diacritics constrain the paths. With
/// `filter_flags` set they are removed from the returned paths.
pub fn extract_paths_fd(
    graph: &TransitionGraph,
    max_num: i32,
    cycles: i32,
    filter_flags: bool,
) -> Result<Vec<Path>, FstError> {
    let table = FlagDiacriticTable::from_symbols(graph.alphabet().iter().copied())?;
    extract(graph, Bounds { max_num, cycles }, Some(table), filter_flags)
}

/// Extraction driven by [`PathOptions`].
pub fn extract_paths_with(graph: &TransitionGraph, options: &PathOptions) -> Result<Vec<Path>, FstError> {
    if options.obey_flags {
        extract_paths_fd(graph, options.max_number, options.max_cycles, options.filter_flags)
    } else {
        extract_paths(graph, options.max_number, options.max_cycles)
    }
}

fn extract(
    graph: &TransitionGraph,
    bounds: Bounds,
    flags: Option<FlagDiacriticTable>,
    filter_flags: bool,
) -> Result<Vec<Path>, FstError> {
    let cyclic = topology::is_cyclic(graph);
    if bounds.max_num <= 0 && bounds.cycles < 0 && cyclic {
        return Err(FstError::CyclicTransducer);
    }
    if bounds.cycles >= 0 || !cyclic {
        return Ok(walk(graph, bounds, flags, filter_flags).into_sorted());
    }

    // Unlimited cycles with a result bound: deepen the cycle bound until
    // enough paths are found or deepening stops producing new ones.
    let mut trimmed = graph.clone();
    topology::connect(&mut trimmed);
    let mut previous = usize::MAX;
    let mut cycles = 0;
    loop {
        let found = walk(&trimmed, Bounds { cycles, ..bounds }, flags.clone(), filter_flags);
        if found.len() >= bounds.max_num as usize || found.len() == previous {
            log::debug!("extract_paths: stopped deepening at cycles={cycles}");
            return Ok(found.into_sorted());
        }
        previous = found.len();
        cycles += 1;
    }
}

fn walk(
    graph: &TransitionGraph,
    bounds: Bounds,
    flags: Option<FlagDiacriticTable>,
    filter_flags: bool,
) -> ResultSet {
    let strip_table = if filter_flags { flags.clone() } else { None };
    let mut flag_stack = flags.map(FlagStack::new);
    let mut results = ResultSet::default();
    let mut pairs = Vec::new();
    let mut visits = vec![0i32; graph.state_count()];
    let limit = (bounds.max_num > 0).then_some(bounds.max_num as usize);

    let record = |pairs: &[wfst_core::SymbolPair], w: Weight, results: &mut ResultSet| {
        let pairs = match &strip_table {
            Some(table) => strip_flags(pairs, table),
            None => pairs.to_vec(),
        };
        results.insert(Path { pairs, weight: w });
    };

    visits[INITIAL_STATE as usize] = 1;
    if let Ok(fw) = graph.final_weight(INITIAL_STATE) {
        record(&pairs, fw, &mut results);
    }
    let mut stack = vec![Frame {
        state: INITIAL_STATE,
        next: 0,
        weight: weight::ONE,
        pairs_len: 0,
        flag_depth: 1,
    }];

    while let Some(top) = stack.last_mut() {
        if limit.is_some_and(|n| results.len() >= n) {
            break;
        }
        let arcs = graph.arcs(top.state);
        if top.next >= arcs.len() {
            visits[top.state as usize] -= 1;
            if let Some(frame) = stack.pop() {
                pairs.truncate(frame.pairs_len);
                if let Some(fs) = flag_stack.as_mut() {
                    fs.truncate(frame.flag_depth);
                }
            }
            continue;
        }
        let t = arcs[top.next];
        top.next += 1;
        let (pairs_len, weight_here) = (pairs.len(), top.weight);

        if bounds.cycles >= 0 && visits[t.target as usize] > bounds.cycles {
            continue;
        }
        let flag_depth = match flag_stack.as_mut() {
            Some(fs) => {
                let before = fs.depth();
                if let Some(flag) = fs.flag_of(&t) {
                    if !fs.push(flag) {
                        continue;
                    }
                }
                before
            }
            None => 1,
        };

        pairs.push(t.pair());
        visits[t.target as usize] += 1;
        let w = weight::times(weight_here, t.weight);
        if let Ok(fw) = graph.final_weight(t.target) {
            record(&pairs, weight::times(w, fw), &mut results);
        }
        stack.push(Frame {
            state: t.target,
            next: 0,
            weight: w,
            pairs_len,
            flag_depth,
        });
    }
    results
}
