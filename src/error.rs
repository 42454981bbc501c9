/*!
Errors that end a `kes` invocation.

Leaf modules return their own error types (`FlagError`, `TlsError`, anyhow
for configuration). Commands convert them into `CliError`, and only `main`
turns a `CliError` into output plus an exit status:

  Help     usage on stdout                         exit 0
  Usage    reason (if any) + usage on stderr       exit 2
  Flag     flag diagnostic + usage on stderr       exit 2
  Fatal    single "Error: ..." line on stderr      exit 1
*/

use std::io::{self, Write};

use clap::error::{ContextKind, ContextValue};
use thiserror::Error;

use crate::flags::FlagError;
use crate::utils::output::{Color, paint};

#[derive(Debug, Error)]
pub enum CliError {
    /// Explicit `-h` / `--help`; carries the usage text to print.
    #[error("help requested")]
    Help(String),

    #[error("{}", .reason.as_deref().unwrap_or("usage error"))]
    Usage {
        usage: String,
        reason: Option<String>,
    },

    #[error("{source}")]
    Flag {
        usage: String,
        #[source]
        source: FlagError,
    },

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl CliError {
    pub fn usage(usage: impl Into<String>, reason: impl Into<String>) -> Self {
        CliError::Usage {
            usage: usage.into(),
            reason: Some(reason.into()),
        }
    }

    /// Map a flag failure of a command whose usage is `usage`.
    pub fn from_flags(err: FlagError, usage: impl Into<String>) -> Self {
        match err {
            FlagError::Help => CliError::Help(usage.into()),
            source => CliError::Flag {
                usage: usage.into(),
                source,
            },
        }
    }

    /// Map a failed top-level parse.
    pub fn from_clap(err: clap::Error, usage: impl Into<String>) -> Self {
        let reason = match err.get(ContextKind::InvalidArg) {
            Some(ContextValue::String(flag)) => format!("flag provided but not defined: {flag}"),
            _ => err
                .kind()
                .as_str()
                .unwrap_or("invalid arguments")
                .to_string(),
        };
        CliError::usage(usage, reason)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Help(_) => 0,
            CliError::Usage { .. } | CliError::Flag { .. } => 2,
            CliError::Fatal(_) => 1,
        }
    }

    /// Write the diagnostic for this error. `color` enables ANSI styling of
    /// the `Error:` prefix.
    pub fn render(&self, out: &mut dyn Write, err: &mut dyn Write, color: bool) -> io::Result<()> {
        match self {
            CliError::Help(usage) => write!(out, "{usage}"),
            CliError::Usage { usage, reason } => {
                if let Some(reason) = reason {
                    writeln!(err, "{reason}")?;
                }
                write!(err, "{usage}")
            }
            CliError::Flag { usage, source } => {
                writeln!(err, "{source}")?;
                write!(err, "{usage}")
            }
            CliError::Fatal(e) => {
                let prefix = if color {
                    paint(Color::Red, "Error:")
                } else {
                    "Error:".to_string()
                };
                writeln!(err, "{prefix} {e:#}")
            }
        }
    }

    /// Print to the process streams.
    pub fn report(&self) {
        let color = crate::utils::output::color_enabled(crate::term::stderr_is_interactive());
        let _ = self.render(&mut io::stdout().lock(), &mut io::stderr().lock(), color);
    }
}

/// Report `err` and terminate with its exit status.
pub fn exit(err: CliError) -> ! {
    err.report();
    std::process::exit(err.exit_code())
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn rendered(e: &CliError) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        e.render(&mut out, &mut err, false).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::Help("u".into()).exit_code(), 0);
        assert_eq!(CliError::usage("u", "r").exit_code(), 2);
        assert_eq!(
            CliError::from_flags(FlagError::Undefined("-x".into()), "u").exit_code(),
            2
        );
        assert_eq!(CliError::from(anyhow!("boom")).exit_code(), 1);
    }

    #[test]
    fn help_goes_to_stdout() {
        let (out, err) = rendered(&CliError::from_flags(FlagError::Help, "usage: kes create\n"));
        assert_eq!(out, "usage: kes create\n");
        assert!(err.is_empty());
    }

    #[test]
    fn flag_error_shows_diagnostic_then_usage() {
        let e = CliError::from_flags(FlagError::Undefined("-x".into()), "usage: kes create\n");
        let (out, err) = rendered(&e);
        assert!(out.is_empty());
        assert_eq!(err, "flag provided but not defined: -x\nusage: kes create\n");
    }

    #[test]
    fn usage_without_reason() {
        let e = CliError::Usage {
            usage: "usage: kes <command>\n".into(),
            reason: None,
        };
        let (_, err) = rendered(&e);
        assert_eq!(err, "usage: kes <command>\n");
    }

    #[test]
    fn fatal_is_one_line_with_causes() {
        let e = CliError::from(anyhow!("no such file").context("Cannot load TLS key or cert for client auth"));
        let (out, err) = rendered(&e);
        assert!(out.is_empty());
        assert_eq!(
            err,
            "Error: Cannot load TLS key or cert for client auth: no such file\n"
        );
    }
}
