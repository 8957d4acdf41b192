use serde::{Deserialize, Serialize};
use wfst_core::weight::Weight;
use wfst_core::{FstError, SymbolPair};

use super::Path;

/// How extracted paths are handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `(input, output, weight)` string triples.
    #[default]
    Tuple,
    /// One `input<TAB>output<TAB>weight` line per path.
    Text,
    /// The symbol pairs themselves.
    Raw,
}

/// Options for path extraction and lookup.
///
/// Negative `max_number` or `max_cycles` mean unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathOptions {
    /// Flag diacritics constrain paths instead of being ordinary symbols.
    pub obey_flags: bool,
    /// Remove flag diacritics from reported paths. Only used with `obey_flags`.
    pub filter_flags: bool,
    pub max_number: i32,
    pub max_cycles: i32,
    /// Lookup drops results heavier than this.
    pub max_weight: Option<Weight>,
    pub output_format: OutputFormat,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            obey_flags: true,
            filter_flags: true,
            max_number: -1,
            max_cycles: -1,
            max_weight: None,
            output_format: OutputFormat::Tuple,
        }
    }
}

impl PathOptions {
    /// Build options from `key = value` string pairs, starting from the
    /// defaults. Unknown keys and unparsable values are rejected.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, FstError> {
        let mut options = Self::default();
        for &(key, value) in pairs {
            let value = value.trim();
            match key.trim() {
                "obey_flags" => options.obey_flags = parse_bool(key, value)?,
                "filter_flags" => options.filter_flags = parse_bool(key, value)?,
                "max_number" => options.max_number = parse_number(key, value)?,
                "max_cycles" => options.max_cycles = parse_number(key, value)?,
                "max_weight" => {
                    let w = value
                        .parse::<Weight>()
                        .map_err(|_| invalid(key, value))?;
                    options.max_weight = Some(w);
                }
                "output_format" => {
                    options.output_format = match value {
                        "tuple" => OutputFormat::Tuple,
                        "text" => OutputFormat::Text,
                        "raw" => OutputFormat::Raw,
                        _ => return Err(invalid(key, value)),
                    }
                }
                other => return Err(FstError::InvalidOption(format!("unknown option '{other}'"))),
            }
        }
        Ok(options)
    }
}

fn invalid(key: &str, value: &str) -> FstError {
    FstError::InvalidOption(format!("bad value '{value}' for '{key}'"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, FstError> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_number(key: &str, value: &str) -> Result<i32, FstError> {
    value.parse().map_err(|_| invalid(key, value))
}

/// Paths converted to one of the [`OutputFormat`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Tuples(Vec<(String, String, Weight)>),
    Text(String),
    Raw(Vec<(Vec<SymbolPair>, Weight)>),
}

pub fn render(paths: &[Path], format: OutputFormat) -> Rendered {
    match format {
        OutputFormat::Tuple => Rendered::Tuples(
            paths
                .iter()
                .map(|p| (p.input_string(), p.output_string(), p.weight))
                .collect(),
        ),
        OutputFormat::Text => {
            let mut text = String::new();
            for p in paths {
                text.push_str(&format!("{}\t{}\t{}\n", p.input_string(), p.output_string(), p.weight));
            }
            Rendered::Text(text)
        }
        OutputFormat::Raw => Rendered::Raw(paths.iter().map(|p| (p.pairs.clone(), p.weight)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::Symbol;

    fn sample() -> Vec<Path> {
        vec![Path {
            pairs: vec![(Symbol::intern("a"), Symbol::intern("b")), (Symbol::EPSILON, Symbol::intern("c"))],
            weight: 1.5,
        }]
    }

    #[test]
    fn defaults() {
        let options = PathOptions::default();
        assert!(options.obey_flags && options.filter_flags);
        assert_eq!((options.max_number, options.max_cycles), (-1, -1));
        assert_eq!(options.output_format, OutputFormat::Tuple);
    }

    #[test]
    fn from_pairs_sets_and_rejects() {
        let options = PathOptions::from_pairs(&[
            ("max_number", "5"),
            ("obey_flags", "false"),
            ("max_weight", "2.5"),
            ("output_format", "raw"),
        ])
        .unwrap();
        assert_eq!(options.max_number, 5);
        assert!(!options.obey_flags);
        assert_eq!(options.max_weight, Some(2.5));
        assert_eq!(options.output_format, OutputFormat::Raw);

        assert!(matches!(
            PathOptions::from_pairs(&[("max_paths", "3")]),
            Err(FstError::InvalidOption(_))
        ));
        assert!(matches!(
            PathOptions::from_pairs(&[("max_cycles", "many")]),
            Err(FstError::InvalidOption(_))
        ));
    }

    #[test]
    fn deserializes_from_json() {
        let options: PathOptions = serde_json::from_str(r#"{"max_cycles": 2, "output_format": "text"}"#).unwrap();
        assert_eq!(options.max_cycles, 2);
        assert_eq!(options.output_format, OutputFormat::Text);
        assert!(options.obey_flags);
        assert!(serde_json::from_str::<PathOptions>(r#"{"cycles": 2}"#).is_err());
    }

    #[test]
    fn render_formats() {
        let paths = sample();
        assert_eq!(
            render(&paths, OutputFormat::Tuple),
            Rendered::Tuples(vec![("a".into(), "bc".into(), 1.5)])
        );
        assert_eq!(render(&paths, OutputFormat::Text), Rendered::Text("a\tbc\t1.5\n".into()));
        match render(&paths, OutputFormat::Raw) {
            Rendered::Raw(raw) => assert_eq!(raw[0].0.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
