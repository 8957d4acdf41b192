// Binary interchange stream: a sequence of self-delimiting records, one per
// automaton.
//
// Record layout (host byte order, little-endian on every supported target):
//   RecordHeader                       32 bytes
//   symbol strings, NUL-terminated     header.symbol_bytes, padded to 8
//   PackedTransition[transition_count] 24 bytes each
//   PackedFinal[final_count]           16 bytes each
//
// Transitions refer to symbols by their index in the record's own symbol
// section; index 0 is always epsilon. `state_count` is one past the highest
// state any transition or final entry names, so unreferenced trailing
// states are not stored.

use std::io::{Read, Write};

use bytemuck::{Pod, Zeroable};
use hashbrown::HashMap;
use wfst_core::weight;
use wfst_core::{FstError, ImplementationType, Symbol};

use crate::graph::{Transition, TransitionGraph};

const COOKIE1: u32 = 0x5746_5354;
const COOKIE2: u32 = 0x0001_0003;
const ALIGN: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RecordHeader {
    pub cookie1: u32,
    pub cookie2: u32,
    pub kind: u8,
    pub _reserved: [u8; 3],
    pub symbol_count: u32,
    pub state_count: u32,
    pub transition_count: u32,
    pub final_count: u32,
    pub symbol_bytes: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PackedTransition {
    pub source: u32,
    pub target: u32,
    pub input: u32,
    pub output: u32,
    pub weight: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PackedFinal {
    pub state: u32,
    pub _padding: u32,
    pub weight: f64,
}

fn padding(len: usize) -> usize {
    (ALIGN - len % ALIGN) % ALIGN
}

/// Write one automaton record. Weights of an unweighted record are written
/// as zero.
pub fn write_binary<W: Write>(out: &mut W, graph: &TransitionGraph, kind: ImplementationType) -> Result<(), FstError> {
    // Symbol section: epsilon first, then the alphabet and any symbol the
    // transitions use, in order.
    let mut table = graph.alphabet().clone();
    table.extend(graph.symbols_used());
    let mut symbols = vec![Symbol::EPSILON];
    symbols.extend(table.into_iter().filter(|s| !s.is_epsilon()));
    let index: HashMap<Symbol, u32> = symbols
        .iter()
        .enumerate()
        .map(|(i, &s)| (s, i as u32))
        .collect();
    let mut symbol_data = Vec::new();
    for s in &symbols {
        symbol_data.extend_from_slice(s.as_str().as_bytes());
        symbol_data.push(0);
    }

    let weight_of = |w: f64| if kind.is_weighted() { w } else { weight::ONE };
    let transitions: Vec<PackedTransition> = graph
        .iter_transitions()
        .map(|(source, t)| PackedTransition {
            source,
            target: t.target,
            input: index[&t.input],
            output: index[&t.output],
            weight: weight_of(t.weight),
        })
        .collect();
    let finals: Vec<PackedFinal> = graph
        .final_states()
        .map(|(state, w)| PackedFinal {
            state,
            _padding: 0,
            weight: weight_of(w),
        })
        .collect();

    let header = RecordHeader {
        cookie1: COOKIE1,
        cookie2: COOKIE2,
        kind: kind.tag(),
        _reserved: [0; 3],
        symbol_count: symbols.len() as u32,
        state_count: referenced_states(&transitions, &finals) as u32,
        transition_count: transitions.len() as u32,
        final_count: finals.len() as u32,
        symbol_bytes: symbol_data.len() as u32,
    };
    out.write_all(bytemuck::bytes_of(&header))?;
    out.write_all(&symbol_data)?;
    out.write_all(&[0u8; ALIGN][..padding(symbol_data.len())])?;
    out.write_all(bytemuck::cast_slice(&transitions))?;
    out.write_all(bytemuck::cast_slice(&finals))?;
    log::trace!(
        "binary: wrote record with {} states, {} transitions",
        header.state_count,
        header.transition_count
    );
    Ok(())
}

/// Reads automaton records from a binary stream. Every record in one stream
/// must carry the same implementation type.
pub struct BinaryReader<R> {
    reader: R,
    kind: Option<ImplementationType>,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, kind: None }
    }

    /// Implementation type of the records read so far.
    pub fn kind(&self) -> Option<ImplementationType> {
        self.kind
    }

    /// Read the next record. Fails with `EndOfStream` at a clean end of the
    /// stream.
    pub fn read_next(&mut self) -> Result<(TransitionGraph, ImplementationType), FstError> {
        let mut header = RecordHeader::zeroed();
        match fill(&mut self.reader, bytemuck::bytes_of_mut(&mut header))? {
            0 => return Err(FstError::EndOfStream),
            n if n < size_of::<RecordHeader>() => {
                return Err(FstError::NotTransducerStream("truncated record header".into()));
            }
            _ => {}
        }
        if header.cookie1 != COOKIE1 || header.cookie2 != COOKIE2 {
            return Err(FstError::NotTransducerStream("bad record magic".into()));
        }
        let kind = ImplementationType::from_tag(header.kind)
            .ok_or_else(|| FstError::NotTransducerStream(format!("unknown implementation tag {}", header.kind)))?;
        match self.kind {
            Some(expected) if expected != kind => {
                return Err(FstError::TypeMismatch { expected, actual: kind });
            }
            _ => self.kind = Some(kind),
        }

        // Every symbol takes at least its terminating NUL.
        if header.symbol_count > header.symbol_bytes {
            return Err(FstError::NotTransducerStream("symbol count exceeds symbol section".into()));
        }
        let symbol_len = header.symbol_bytes as usize;
        let symbol_data = self.read_bytes(symbol_len + padding(symbol_len))?;
        let symbols = parse_symbols(&symbol_data[..symbol_len], header.symbol_count as usize)?;

        let transitions: Vec<PackedTransition> = self.read_packed(header.transition_count)?;
        let finals: Vec<PackedFinal> = self.read_packed(header.final_count)?;
        if header.state_count as u64 > referenced_states(&transitions, &finals) {
            return Err(FstError::NotTransducerStream(format!(
                "state count {} exceeds the states referenced",
                header.state_count
            )));
        }

        let mut graph = TransitionGraph::new();
        if header.state_count > 0 {
            graph.ensure_state(header.state_count - 1);
        }
        graph.add_symbols_to_alphabet(symbols.iter().copied());
        let symbol_at = |i: u32| {
            symbols
                .get(i as usize)
                .copied()
                .ok_or_else(|| FstError::NotTransducerStream(format!("symbol index {i} out of range")))
        };
        for p in &transitions {
            if p.source >= header.state_count || p.target >= header.state_count {
                return Err(FstError::NotTransducerStream("transition state out of range".into()));
            }
            let t = Transition::new(p.target, symbol_at(p.input)?, symbol_at(p.output)?, p.weight);
            graph.add_transition_with(p.source, t, false);
        }
        for f in &finals {
            if f.state >= header.state_count {
                return Err(FstError::NotTransducerStream("final state out of range".into()));
            }
            graph.set_final_weight(f.state, f.weight);
        }
        log::trace!(
            "binary: read {kind:?} record with {} states, {} transitions",
            header.state_count,
            header.transition_count
        );
        Ok((graph, kind))
    }

    /// Read exactly `len` bytes. The buffer only grows as data arrives, so a
    /// forged length cannot allocate more than the stream holds.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, FstError> {
        let mut bytes = Vec::new();
        (&mut self.reader).take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() < len {
            return Err(FstError::NotTransducerStream("truncated record".into()));
        }
        Ok(bytes)
    }

    fn read_packed<T: Pod>(&mut self, count: u32) -> Result<Vec<T>, FstError> {
        let len = (count as usize)
            .checked_mul(size_of::<T>())
            .ok_or_else(|| FstError::NotTransducerStream("record section too large".into()))?;
        let bytes = self.read_bytes(len)?;
        Ok(bytes.chunks_exact(size_of::<T>()).map(bytemuck::pod_read_unaligned).collect())
    }
}

/// One past the highest state named by a transition or final entry; the
/// initial state always counts.
fn referenced_states(transitions: &[PackedTransition], finals: &[PackedFinal]) -> u64 {
    transitions
        .iter()
        .flat_map(|p| [p.source, p.target])
        .chain(finals.iter().map(|f| f.state))
        .max()
        .map_or(1, |highest| highest as u64 + 1)
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FstError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn parse_symbols(data: &[u8], count: usize) -> Result<Vec<Symbol>, FstError> {
    let mut symbols = Vec::with_capacity(count);
    for raw in data.split(|&b| b == 0).take(count) {
        let name = std::str::from_utf8(raw).map_err(|_| FstError::IncorrectUtf8Coding)?;
        symbols.push(Symbol::intern(name));
    }
    if symbols.len() != count || data.last() != Some(&0) {
        return Err(FstError::NotTransducerStream("malformed symbol section".into()));
    }
    Ok(symbols)
}

/// Read every record in `data`.
pub fn read_binary_all(data: &[u8]) -> Result<Vec<(TransitionGraph, ImplementationType)>, FstError> {
    let mut reader = BinaryReader::new(data);
    let mut records = Vec::new();
    loop {
        match reader.read_next() {
            Ok(record) => records.push(record),
            Err(FstError::EndOfStream) => return Ok(records),
            Err(e) => return Err(e),
        }
    }
}
