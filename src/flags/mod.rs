/*!
Flag sets for command-level options.

Every command declares its own `FlagSet` and hands its raw arguments to
`split_flags`, which lets flags appear anywhere between positionals:

```text
kes create my-key -k          (same as)   kes create -k my-key
```

Accepted token forms:
  -name            boolean flags only (sets true)
  --name           same as -name
  -name=value      any flag kind
  --name=value     same as -name=value

Limitation of the splitter:
  Every token starting with `-` is parsed on its own, so a detached value
  (`-name value`) is never seen by the flag. A string flag written that way
  fails with `flag needs an argument`.

Key items:
  FlagSet::{bool,string}       registration (names share one value)
  FlagSet::parse_token         single-token mode
  split_flags / is_set         the helpers used by commands
*/

use std::fmt;

use thiserror::Error;

/* ---- Errors ---- */

/// Failure while parsing a single flag token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// `-h`, `-help` or `--help` without a registered flag of that name.
    #[error("help requested")]
    Help,
    #[error("flag provided but not defined: {0}")]
    Undefined(String),
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),
    #[error("flag needs an argument: {0}")]
    MissingValue(String),
    #[error("invalid value \"{value}\" for flag {flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },
}

/* ---- Values ---- */

/// Kind of value a flag holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Bool,
    String,
}

/// Current (or default) value of a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    String(String),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::String(_) => FlagKind::String,
        }
    }

    /// Whether this is the zero value of its kind (omitted from usage output).
    fn is_zero(&self) -> bool {
        match self {
            FlagValue::Bool(b) => !b,
            FlagValue::String(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{b}"),
            FlagValue::String(s) => write!(f, "{s}"),
        }
    }
}

/* ---- Flag set ---- */

#[derive(Debug, Clone)]
struct Flag {
    names: Vec<String>,
    usage: String,
    default: FlagValue,
    value: FlagValue,
    visited: bool,
}

/// A named collection of flag definitions together with their parsed values.
///
/// A definition may carry several names (`-k` and `--insecure`); all of them
/// read and write the same value and share one presence marker.
#[derive(Debug, Clone)]
pub struct FlagSet {
    name: String,
    flags: Vec<Flag>,
}

/// Shape of a single command-line token.
enum Token<'a> {
    /// Does not start a flag (positional, or a lone `-`).
    NotFlag,
    /// `--` on its own.
    Terminator,
    Flag { name: &'a str, value: Option<&'a str> },
}

fn classify(token: &str) -> Result<Token<'_>, FlagError> {
    if token.len() < 2 || !token.starts_with('-') {
        return Ok(Token::NotFlag);
    }
    let name = if let Some(rest) = token.strip_prefix("--") {
        if rest.is_empty() {
            return Ok(Token::Terminator);
        }
        rest
    } else {
        &token[1..]
    };
    if name.starts_with('-') || name.starts_with('=') {
        return Err(FlagError::BadSyntax(token.to_string()));
    }
    Ok(match name.split_once('=') {
        Some((name, value)) => Token::Flag {
            name,
            value: Some(value),
        },
        None => Token::Flag { name, value: None },
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl FlagSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a boolean flag.
    pub fn bool(&mut self, names: &[&str], default: bool, usage: &str) -> &mut Self {
        self.define(names, FlagValue::Bool(default), usage)
    }

    /// Register a string flag.
    pub fn string(&mut self, names: &[&str], default: &str, usage: &str) -> &mut Self {
        self.define(names, FlagValue::String(default.to_string()), usage)
    }

    fn define(&mut self, names: &[&str], default: FlagValue, usage: &str) -> &mut Self {
        assert!(!names.is_empty(), "{}: flag without a name", self.name);
        for n in names {
            assert!(
                self.find(n).is_none(),
                "{}: flag redefined: {}",
                self.name,
                n
            );
        }
        self.flags.push(Flag {
            names: names.iter().map(|n| n.to_string()).collect(),
            usage: usage.to_string(),
            value: default.clone(),
            default,
            visited: false,
        });
        self
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.flags
            .iter()
            .position(|f| f.names.iter().any(|n| n == name))
    }

    fn lookup(&self, name: &str) -> Result<usize, FlagError> {
        match self.find(name) {
            Some(idx) => Ok(idx),
            None if name == "h" || name == "help" => Err(FlagError::Help),
            None => Err(FlagError::Undefined(format!("-{name}"))),
        }
    }

    fn set(&mut self, name: &str, raw: Option<&str>) -> Result<(), FlagError> {
        let idx = self.lookup(name)?;
        let flag = &mut self.flags[idx];
        let parsed = match (flag.default.kind(), raw) {
            (FlagKind::Bool, None) => FlagValue::Bool(true),
            (FlagKind::Bool, Some(v)) => {
                FlagValue::Bool(parse_bool(v).ok_or_else(|| FlagError::InvalidValue {
                    flag: format!("-{name}"),
                    value: v.to_string(),
                    reason: "parse error".to_string(),
                })?)
            }
            (FlagKind::String, None) => return Err(FlagError::MissingValue(format!("-{name}"))),
            (FlagKind::String, Some(v)) => FlagValue::String(v.to_string()),
        };
        flag.value = parsed;
        flag.visited = true;
        Ok(())
    }

    /// Parse exactly one token in isolation.
    ///
    /// Tokens that are not flags (`foo`, `-`, `--`) leave the set untouched.
    pub fn parse_token(&mut self, token: &str) -> Result<(), FlagError> {
        match classify(token)? {
            Token::NotFlag | Token::Terminator => Ok(()),
            Token::Flag { name, value } => self.set(name, value),
        }
    }

    /// Current value of the flag registered under `name`.
    pub fn value(&self, name: &str) -> Option<&FlagValue> {
        self.find(name).map(|idx| &self.flags[idx].value)
    }

    /// Boolean value, `false` for unknown or non-boolean flags.
    pub fn get_bool(&self, name: &str) -> bool {
        matches!(self.value(name), Some(FlagValue::Bool(true)))
    }

    /// String value, empty for unknown or non-string flags.
    pub fn get_str(&self, name: &str) -> &str {
        match self.value(name) {
            Some(FlagValue::String(s)) => s,
            _ => "",
        }
    }

    /// Whether the flag was explicitly supplied, under any of its names.
    pub fn is_set(&self, name: &str) -> bool {
        self.find(name).is_some_and(|idx| self.flags[idx].visited)
    }

    /// Render one line per definition, suitable for a command usage block.
    pub fn usage(&self) -> String {
        let mut out = String::new();
        for flag in &self.flags {
            let mut names = flag
                .names
                .iter()
                .map(|n| {
                    if n.chars().count() == 1 {
                        format!("-{n}")
                    } else {
                        format!("--{n}")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            if flag.default.kind() != FlagKind::Bool {
                names.push_str("=<value>");
            }
            let mut line = format!("  {names:<26} {}", flag.usage);
            if !flag.default.is_zero() {
                line.push_str(&format!(" (default: {})", flag.default));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/* ---- Command helpers ---- */

/// Walk `args` once, feeding every `-`-prefixed token to `set` on its own and
/// collecting everything else, in order, as positionals.
///
/// The first failing flag token aborts the walk.
pub fn split_flags(set: &mut FlagSet, args: &[String]) -> Result<Vec<String>, FlagError> {
    let mut positionals = Vec::new();
    for arg in args {
        if arg.starts_with('-') {
            set.parse_token(arg)?;
        } else {
            positionals.push(arg.clone());
        }
    }
    Ok(positionals)
}

/// Whether `name` was explicitly supplied while parsing `set`.
pub fn is_set(set: &FlagSet, name: &str) -> bool {
    set.is_set(name)
}

/* --------------------------------- Tests ---------------------------------- */
