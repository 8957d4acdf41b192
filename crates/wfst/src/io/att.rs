// Tab-separated text interchange format.
//
//   src  dst  in  out  [weight]    transition line
//   state  [weight]                final-state line
//   --                             separator between automata
//
// Space, tab and colon inside symbols are escaped as @_SPACE_@, @_TAB_@ and
// @_COLON_@; epsilon is written as @0@. A symbol that already contains one
// of those tokens has no text form and is rejected on write.

use std::io::{BufRead, Write};

use wfst_core::weight::{self, Weight};
use wfst_core::{FstError, StateId, Symbol};

use crate::graph::{Transition, TransitionGraph};

const EPSILON_TOKEN: &str = "@0@";
const SPACE_TOKEN: &str = "@_SPACE_@";
const TAB_TOKEN: &str = "@_TAB_@";
const COLON_TOKEN: &str = "@_COLON_@";
const SEPARATOR: &str = "--";

/// Options for reading the text format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttReadOptions {
    /// Token read as epsilon, in addition to `@0@`.
    pub epsilon_symbol: String,
    /// Token read as a literal space.
    pub space_symbol: String,
}

impl Default for AttReadOptions {
    fn default() -> Self {
        Self {
            epsilon_symbol: EPSILON_TOKEN.to_string(),
            space_symbol: SPACE_TOKEN.to_string(),
        }
    }
}

/// Options for writing the text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttWriteOptions {
    pub write_weights: bool,
}

impl Default for AttWriteOptions {
    fn default() -> Self {
        Self { write_weights: true }
    }
}

/// Reads automata one at a time from a text stream.
pub struct AttReader<R> {
    reader: R,
    options: AttReadOptions,
    line: usize,
    after_separator: bool,
}

impl<R: BufRead> AttReader<R> {
    pub fn new(reader: R, options: AttReadOptions) -> Self {
        Self {
            reader,
            options,
            line: 0,
            after_separator: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Read the next automaton. Fails with `EndOfStream` once the stream
    /// is exhausted, and with `NotValidFormat` if it ends right after a
    /// separator.
    pub fn read_next(&mut self) -> Result<TransitionGraph, FstError> {
        let mut graph = TransitionGraph::new();
        let mut seen_line = false;
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                if seen_line {
                    self.after_separator = false;
                    return Ok(graph);
                }
                if self.after_separator {
                    return Err(FstError::NotValidFormat {
                        line: self.line,
                        message: "stream ends after a separator".into(),
                    });
                }
                return Err(FstError::EndOfStream);
            }
            self.line += 1;
            let line = buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            if line.trim() == SEPARATOR {
                self.after_separator = true;
                log::trace!("att: automaton ends at line {}", self.line);
                return Ok(graph);
            }
            self.parse_line(&mut graph, line)?;
            seen_line = true;
        }
    }

    fn parse_line(&self, graph: &mut TransitionGraph, line: &str) -> Result<(), FstError> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        match fields.as_slice() {
            [state] => {
                graph.set_final_weight(self.state(state, line)?, weight::ONE);
            }
            [state, w] => {
                graph.set_final_weight(self.state(state, line)?, self.weight(w, line)?);
            }
            [src, dst, input, output] | [src, dst, input, output, _] => {
                let w = match fields.get(4) {
                    Some(w) => self.weight(w, line)?,
                    None => weight::ONE,
                };
                let transition = Transition::new(
                    self.state(dst, line)?,
                    self.symbol(input),
                    self.symbol(output),
                    w,
                );
                graph.add_transition(self.state(src, line)?, transition);
            }
            _ => return Err(self.invalid(line)),
        }
        Ok(())
    }

    fn state(&self, field: &str, line: &str) -> Result<StateId, FstError> {
        field.parse().map_err(|_| self.invalid(line))
    }

    fn weight(&self, field: &str, line: &str) -> Result<Weight, FstError> {
        field.parse().map_err(|_| self.invalid(line))
    }

    fn symbol(&self, field: &str) -> Symbol {
        if field == self.options.epsilon_symbol || field == EPSILON_TOKEN {
            return Symbol::EPSILON;
        }
        let name = field
            .replace(self.options.space_symbol.as_str(), " ")
            .replace(TAB_TOKEN, "\t")
            .replace(COLON_TOKEN, ":");
        Symbol::intern(&name)
    }

    fn invalid(&self, line: &str) -> FstError {
        FstError::NotValidFormat {
            line: self.line,
            message: line.to_string(),
        }
    }
}

/// Read every automaton in `text`.
pub fn read_att_str(text: &str, options: &AttReadOptions) -> Result<Vec<TransitionGraph>, FstError> {
    let mut reader = AttReader::new(text.as_bytes(), options.clone());
    let mut graphs = Vec::new();
    loop {
        match reader.read_next() {
            Ok(graph) => graphs.push(graph),
            Err(FstError::EndOfStream) => return Ok(graphs),
            Err(e) => return Err(e),
        }
    }
}

fn escape(symbol: Symbol, line: usize) -> Result<String, FstError> {
    if symbol.is_epsilon() {
        return Ok(EPSILON_TOKEN.to_string());
    }
    let name = symbol.as_str();
    if name == EPSILON_TOKEN || [SPACE_TOKEN, TAB_TOKEN, COLON_TOKEN].iter().any(|token| name.contains(token)) {
        return Err(FstError::NotValidFormat {
            line,
            message: format!("symbol {name} cannot be written in text form"),
        });
    }
    Ok(name
        .replace(' ', SPACE_TOKEN)
        .replace('\t', TAB_TOKEN)
        .replace(':', COLON_TOKEN))
}

/// Write one automaton. States are written in order, each state's
/// transitions followed by its final line.
pub fn write_att<W: Write>(out: &mut W, graph: &TransitionGraph, options: AttWriteOptions) -> Result<(), FstError> {
    let mut line = 0;
    for state in graph.states() {
        for t in graph.transitions(state)? {
            line += 1;
            let (input, output) = (escape(t.input, line)?, escape(t.output, line)?);
            write!(out, "{state}\t{}\t{input}\t{output}", t.target)?;
            if options.write_weights {
                write!(out, "\t{}", t.weight)?;
            }
            writeln!(out)?;
        }
        if let Ok(w) = graph.final_weight(state) {
            line += 1;
            if options.write_weights {
                writeln!(out, "{state}\t{w}")?;
            } else {
                writeln!(out, "{state}")?;
            }
        }
    }
    Ok(())
}

/// Write several automata separated by `--` lines.
pub fn write_att_stream<W: Write>(
    out: &mut W,
    graphs: &[TransitionGraph],
    options: AttWriteOptions,
) -> Result<(), FstError> {
    for (i, graph) in graphs.iter().enumerate() {
        if i > 0 {
            writeln!(out, "{SEPARATOR}")?;
        }
        write_att(out, graph, options)?;
    }
    Ok(())
}

pub fn to_att_string(graph: &TransitionGraph, options: AttWriteOptions) -> Result<String, FstError> {
    let mut buf = Vec::new();
    write_att(&mut buf, graph, options)?;
    String::from_utf8(buf).map_err(|_| FstError::IncorrectUtf8Coding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_transitions_and_finals() {
        let text = "0\t1\ta\tb\t0.5\n1\t2\t@0@\tc\n2\t1.25\n";
        let graphs = read_att_str(text, &AttReadOptions::default()).unwrap();
        assert_eq!(graphs.len(), 1);
        let g = &graphs[0];
        assert_eq!(g.state_count(), 3);
        assert_eq!(g.transition_count(), 2);
        assert_eq!(g.final_weight(2).unwrap(), 1.25);
        let t = g.transitions(1).unwrap()[0];
        assert_eq!(t.input, Symbol::EPSILON);
        assert_eq!(t.weight, 0.0);
    }

    #[test]
    fn separator_splits_stream() {
        let text = "0\t1\ta\ta\n1\n--\n0\n";
        let graphs = read_att_str(text, &AttReadOptions::default()).unwrap();
        assert_eq!(graphs.len(), 2);
        assert!(graphs[1].is_final_state(0));
    }

    #[test]
    fn trailing_separator_is_an_error() {
        let err = read_att_str("0\n--\n", &AttReadOptions::default()).unwrap_err();
        assert!(matches!(err, FstError::NotValidFormat { line: 2, .. }));
    }

    #[test]
    fn malformed_line_is_reported_with_number() {
        let err = read_att_str("0\t1\ta\tb\n0\t1\ta\n", &AttReadOptions::default()).unwrap_err();
        match err {
            FstError::NotValidFormat { line, message } => {
                assert_eq!(line, 2);
                assert_eq!(message, "0\t1\ta");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(read_att_str("x\t1\ta\tb\n", &AttReadOptions::default()).is_err());
    }

    #[test]
    fn custom_epsilon_and_space_tokens() {
        let options = AttReadOptions {
            epsilon_symbol: "<eps>".into(),
            space_symbol: "<sp>".into(),
        };
        let g = &read_att_str("0\t1\t<eps>\t<sp>\n1\n", &options).unwrap()[0];
        let t = g.transitions(0).unwrap()[0];
        assert_eq!(t.input, Symbol::EPSILON);
        assert_eq!(t.output.as_str(), " ");
    }

    #[test]
    fn writes_escaped_symbols() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::new(1, Symbol::intern(" "), Symbol::EPSILON, 1.0));
        g.set_final_weight(1, 0.0);
        let text = to_att_string(&g, AttWriteOptions::default()).unwrap();
        assert_eq!(text, "0\t1\t@_SPACE_@\t@0@\t1\n1\t0\n");
        let bare = to_att_string(&g, AttWriteOptions { write_weights: false }).unwrap();
        assert_eq!(bare, "0\t1\t@_SPACE_@\t@0@\n1\n");
    }

    #[test]
    fn colon_tab_and_space_survive_a_round_trip() {
        let mut g = TransitionGraph::new();
        g.add_transition(0, Transition::from_strs(1, "a:b", "x\ty", 0.0));
        g.add_transition(1, Transition::from_strs(2, ":", "two words", 0.5));
        g.set_final_weight(2, 0.0);
        let text = to_att_string(&g, AttWriteOptions::default()).unwrap();
        assert!(text.starts_with("0\t1\ta@_COLON_@b\tx@_TAB_@y\t"));
        let read = &read_att_str(&text, &AttReadOptions::default()).unwrap()[0];
        assert!(read.iter_transitions().eq(g.iter_transitions()));
        assert_eq!(read.final_weight(2).unwrap(), 0.0);
    }

    #[test]
    fn symbols_spelled_like_escapes_are_rejected() {
        for name in ["@_SPACE_@", "x@_TAB_@", "@_COLON_@", "@0@"] {
            let mut g = TransitionGraph::new();
            g.set_final_weight(0, 0.0);
            g.add_transition(0, Transition::from_strs(1, "a", name, 0.0));
            assert!(matches!(
                to_att_string(&g, AttWriteOptions::default()),
                Err(FstError::NotValidFormat { line: 1, .. })
            ));
        }
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut reader = AttReader::new("".as_bytes(), AttReadOptions::default());
        assert!(matches!(reader.read_next(), Err(FstError::EndOfStream)));
    }
}
