// Flag diacritic operations: P, N, R, D, C, U
//
// A flag diacritic is a symbol of the form `@OP.FEATURE.VALUE@` or
// `@OP.FEATURE@`. Path traversal treats it as epsilon for string purposes but
// checks and updates a per-path feature state.

use crate::{FstError, Symbol};
use hashbrown::HashMap;

/// The six flag diacritic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagOp {
    /// Positive set: unconditionally set the feature to the value.
    P,
    /// Negative set: set the feature to the negation of the value.
    N,
    /// Require: fail unless the feature is set (no value) or equals the value.
    R,
    /// Disallow: fail if the feature is set (no value) or equals the value.
    D,
    /// Clear: reset the feature to neutral.
    C,
    /// Unification: set if neutral or negatively set to another value, pass if
    /// equal, fail otherwise.
    U,
}

impl FlagOp {
    fn from_byte(b: u8) -> Option<FlagOp> {
        match b {
            b'P' => Some(FlagOp::P),
            b'N' => Some(FlagOp::N),
            b'R' => Some(FlagOp::R),
            b'D' => Some(FlagOp::D),
            b'C' => Some(FlagOp::C),
            b'U' => Some(FlagOp::U),
            _ => None,
        }
    }

    /// Operations that may omit the value part.
    fn allows_empty_value(self) -> bool {
        matches!(self, FlagOp::R | FlagOp::D | FlagOp::C)
    }
}

/// Neutral value: feature has not been set. Also the value index of `@R.F@`-style
/// operations that carry no value.
pub const FLAG_VALUE_NEUTRAL: i32 = 0;

/// A parsed flag diacritic with its feature and value indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDiacritic {
    pub op: FlagOp,
    pub feature: u16,
    pub value: i32,
}

/// Outcome of evaluating one flag diacritic against a feature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOutcome {
    Blocked,
    /// The path continues with `feature` set to `value`.
    Set { feature: u16, value: i32 },
    /// The path continues, feature untouched.
    Keep { feature: u16 },
}

/// Check whether a flag diacritic is allowed given the current value of its feature.
///
/// The caller applies the returned update to its own flag state.
pub fn evaluate(fd: &FlagDiacritic, current_value: i32) -> FlagOutcome {
    let feature = fd.feature;
    match fd.op {
        FlagOp::P => FlagOutcome::Set {
            feature,
            value: fd.value,
        },
        FlagOp::N => FlagOutcome::Set {
            feature,
            value: -fd.value,
        },
        FlagOp::C => FlagOutcome::Set {
            feature,
            value: FLAG_VALUE_NEUTRAL,
        },
        FlagOp::R => {
            let ok = if fd.value == FLAG_VALUE_NEUTRAL {
                current_value != FLAG_VALUE_NEUTRAL
            } else {
                current_value == fd.value
            };
            if ok {
                FlagOutcome::Keep { feature }
            } else {
                FlagOutcome::Blocked
            }
        }
        FlagOp::D => {
            let ok = if fd.value == FLAG_VALUE_NEUTRAL {
                current_value == FLAG_VALUE_NEUTRAL
            } else {
                current_value != fd.value
            };
            if ok {
                FlagOutcome::Keep { feature }
            } else {
                FlagOutcome::Blocked
            }
        }
        FlagOp::U => {
            if current_value == fd.value {
                FlagOutcome::Keep { feature }
            } else if current_value == FLAG_VALUE_NEUTRAL
                || (current_value < 0 && -current_value != fd.value)
            {
                FlagOutcome::Set {
                    feature,
                    value: fd.value,
                }
            } else {
                FlagOutcome::Blocked
            }
        }
    }
}

/// Split a flag diacritic string into operation, feature and optional value.
///
/// Returns `None` when the string does not have flag diacritic shape.
pub fn split_flag(symbol: &str) -> Option<(FlagOp, &str, Option<&str>)> {
    let bytes = symbol.as_bytes();
    if bytes.len() < 5 || bytes[0] != b'@' || bytes[2] != b'.' || bytes[bytes.len() - 1] != b'@'
    {
        return None;
    }
    let op = FlagOp::from_byte(bytes[1])?;
    let inner = &symbol[3..symbol.len() - 1];
    let (feature, value) = match inner.find('.') {
        Some(dot) => (&inner[..dot], Some(&inner[dot + 1..])),
        None => (inner, None),
    };
    if feature.is_empty() || value.is_some_and(str::is_empty) {
        return None;
    }
    if value.is_none() && !op.allows_empty_value() {
        return None;
    }
    Some((op, feature, value))
}

/// Whether `symbol` has the shape `@[PNDRCU].FEATURE(.VALUE)?@`.
pub fn is_flag_diacritic(symbol: &str) -> bool {
    split_flag(symbol).is_some()
}

/// Feature and value numbering for the flag diacritics of one transducer.
///
/// Features are numbered from zero and values from one, both in order of
/// first appearance; value zero is reserved for "neutral".
#[derive(Debug, Clone, Default)]
pub struct FlagDiacriticTable {
    features: HashMap<String, u16>,
    values: HashMap<String, i32>,
    operations: HashMap<Symbol, FlagDiacritic>,
}

impl FlagDiacriticTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from every flag diacritic among `symbols`; other symbols are skipped.
    ///
    /// Fails with `InvalidFlagDiacritic` when the features or values no
    /// longer fit their index type.
    pub fn from_symbols<I: IntoIterator<Item = Symbol>>(symbols: I) -> Result<Self, FstError> {
        let mut table = FlagDiacriticTable::new();
        for symbol in symbols.into_iter().filter(|s| s.is_flag_diacritic()) {
            table.define(symbol)?;
        }
        Ok(table)
    }

    /// Distinct features defined so far.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Parse a flag diacritic string, assigning feature and value indices on
    /// first sight.
    pub fn parse(&mut self, symbol: &str) -> Result<FlagDiacritic, FstError> {
        let (op, feature_str, value_str) = split_flag(symbol)
            .ok_or_else(|| FstError::InvalidFlagDiacritic(symbol.to_string()))?;

        let too_many = || FstError::InvalidFlagDiacritic(format!("{symbol}: too many features or values"));
        let feature = match self.features.get(feature_str) {
            Some(&index) => index,
            None => {
                let next = u16::try_from(self.features.len()).map_err(|_| too_many())?;
                self.features.insert(feature_str.to_string(), next);
                next
            }
        };

        let value = match value_str {
            None => FLAG_VALUE_NEUTRAL,
            Some(v) => match self.values.get(v) {
                Some(&index) => index,
                None => {
                    let next = i32::try_from(self.values.len() + 1).map_err(|_| too_many())?;
                    self.values.insert(v.to_string(), next);
                    next
                }
            },
        };

        Ok(FlagDiacritic { op, feature, value })
    }

    /// Parse and remember the operation carried by `symbol`.
    pub fn define(&mut self, symbol: Symbol) -> Result<FlagDiacritic, FstError> {
        if let Some(fd) = self.operations.get(&symbol) {
            return Ok(*fd);
        }
        let fd = self.parse(symbol.as_str())?;
        self.operations.insert(symbol, fd);
        Ok(fd)
    }

    /// The operation of a previously defined symbol, or `None` for ordinary symbols.
    pub fn get(&self, symbol: Symbol) -> Option<&FlagDiacritic> {
        self.operations.get(&symbol)
    }

    pub fn is_flag(&self, symbol: Symbol) -> bool {
        self.operations.contains_key(&symbol)
    }

    /// A neutral feature state sized for this table.
    pub fn initial_state(&self) -> FlagState {
        FlagState {
            values: vec![FLAG_VALUE_NEUTRAL; self.features.len()],
        }
    }
}

/// Feature values along one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FlagState {
    values: Vec<i32>,
}

impl FlagState {
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Apply `fd`, returning `false` (and leaving the state untouched) when it is rejected.
    pub fn apply(&mut self, fd: &FlagDiacritic) -> bool {
        let index = fd.feature as usize;
        if index >= self.values.len() {
            self.values.resize(index + 1, FLAG_VALUE_NEUTRAL);
        }
        match evaluate(fd, self.values[index]) {
            FlagOutcome::Blocked => false,
            FlagOutcome::Set { feature, value } => {
                self.values[feature as usize] = value;
                true
            }
            FlagOutcome::Keep { .. } => true,
        }
    }
}
