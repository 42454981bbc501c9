/*!
shared.rs - setup shared by every command handler.

Focus:
  - common flags (-v/--verbose, -q/--quiet, --json)
  - Invocation: parsed positionals + flag set + output mode
  - client_config: key server address and client credentials
  - unsupported: the terminal step of handlers whose work belongs to the
    key server client/server
*/

use anyhow::anyhow;

use crate::config::ClientConfig;
use crate::error::CliError;
use crate::flags::{FlagSet, is_set, split_flags};
use crate::utils::logging::{derive_level, set_log_level};

/* ---- Output mode ---- */

/// How a command renders its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human readable, used on terminals.
    Text,
    /// Machine readable, used for pipes and redirects.
    Json,
}

/// `--json` wins whenever it was given (even as `--json=false`); otherwise
/// the mode follows whether stdout is a terminal.
pub fn output_mode(flags: &FlagSet, stdout_is_terminal: bool) -> OutputMode {
    let json = if is_set(flags, "json") {
        flags.get_bool("json")
    } else {
        !stdout_is_terminal
    };
    if json { OutputMode::Json } else { OutputMode::Text }
}

/* ---- Invocation ---- */

/// Register the flags every command accepts.
pub fn common_flags(set: &mut FlagSet) {
    set.bool(&["v", "verbose"], false, "Print debug output")
        .bool(&["q", "quiet"], false, "Only print errors")
        .bool(&["json"], false, "Print the result as JSON");
}

/// Command usage: `header` followed by the flag listing of `set`.
pub fn usage_of(header: &str, set: &FlagSet) -> String {
    format!("{}\n\n{}", header.trim_end(), set.usage())
}

/// A parsed command line.
#[derive(Debug)]
pub struct Invocation {
    pub positionals: Vec<String>,
    pub flags: FlagSet,
    pub output: OutputMode,
    pub usage: String,
}

impl Invocation {
    /// Split `args[1..]` against `set` (after adding the common flags) and
    /// apply the logging flags.
    pub fn parse(mut set: FlagSet, header: &str, args: &[String]) -> Result<Self, CliError> {
        common_flags(&mut set);
        let usage = usage_of(header, &set);
        let rest = args.get(1..).unwrap_or_default();
        let positionals =
            split_flags(&mut set, rest).map_err(|e| CliError::from_flags(e, usage.clone()))?;

        if is_set(&set, "verbose") || is_set(&set, "quiet") {
            set_log_level(derive_level(set.get_bool("verbose"), set.get_bool("quiet")));
        }
        let output = output_mode(&set, crate::term::stdout_is_interactive());
        crate::log_trace!(
            "{}: positionals={:?} output={:?}",
            set.name(),
            positionals,
            output
        );

        Ok(Self {
            positionals,
            flags: set,
            output,
            usage,
        })
    }

    /// Usage error unless the number of positionals is within `min..=max`.
    pub fn expect_args(&self, min: usize, max: usize) -> Result<(), CliError> {
        let n = self.positionals.len();
        if n < min {
            return Err(CliError::usage(&self.usage, "missing arguments"));
        }
        if n > max {
            return Err(CliError::usage(&self.usage, "too many arguments"));
        }
        Ok(())
    }

    /// Positional `idx`, or `default` when absent.
    pub fn arg_or<'a>(&'a self, idx: usize, default: &'a str) -> &'a str {
        self.positionals.get(idx).map_or(default, String::as_str)
    }

    pub fn usage_error(&self, reason: impl Into<String>) -> CliError {
        CliError::usage(&self.usage, reason)
    }
}

/* ---- Client setup ---- */

/// Register `-k/--insecure`.
pub fn insecure_flag(set: &mut FlagSet) {
    set.bool(
        &["k", "insecure"],
        false,
        "Skip TLS certificate verification",
    );
}

/// Key server connection for `inv`, honouring `-k`.
pub fn client_config(inv: &Invocation) -> Result<ClientConfig, CliError> {
    let cfg = ClientConfig::from_env(inv.flags.get_bool("insecure"))?;
    crate::log_debug!(
        "key server {} (client auth: {}, insecure: {})",
        cfg.server,
        if cfg.has_client_auth() { "on" } else { "off" },
        cfg.insecure
    );
    Ok(cfg)
}

/// Fatal error for an operation that needs the key server protocol.
pub fn unsupported(operation: &str, target: &str) -> CliError {
    CliError::Fatal(anyhow!(
        "{operation}: not supported by this build (no key server protocol for {target})"
    ))
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn with_json(tokens: &[&str]) -> FlagSet {
        let mut set = FlagSet::new("t");
        common_flags(&mut set);
        split_flags(&mut set, &args(tokens)).unwrap();
        set
    }

    #[test]
    fn output_follows_terminal_without_flag() {
        let set = with_json(&[]);
        assert_eq!(output_mode(&set, true), OutputMode::Text);
        assert_eq!(output_mode(&set, false), OutputMode::Json);
    }

    #[test]
    fn json_flag_presence_overrides_terminal() {
        assert_eq!(output_mode(&with_json(&["--json"]), true), OutputMode::Json);
        assert_eq!(
            output_mode(&with_json(&["--json=false"]), false),
            OutputMode::Text
        );
    }

    #[test]
    fn invocation_skips_command_name() {
        let mut set = FlagSet::new("create");
        insecure_flag(&mut set);
        let inv = Invocation::parse(set, "usage: kes create", &args(&["create", "k1", "-k"])).unwrap();
        assert_eq!(inv.positionals, args(&["k1"]));
        assert!(inv.flags.get_bool("insecure"));
        assert!(inv.usage.contains("-k, --insecure"));
        assert!(inv.usage.contains("-v, --verbose"));
    }

    #[test]
    fn invocation_help() {
        let err = Invocation::parse(FlagSet::new("x"), "usage: kes x", &args(&["x", "--help"]))
            .unwrap_err();
        assert!(matches!(err, CliError::Help(ref u) if u.starts_with("usage: kes x")));
    }

    #[test]
    fn arity_checks() {
        let inv = Invocation::parse(FlagSet::new("x"), "usage", &args(&["x", "a", "b"])).unwrap();
        assert!(inv.expect_args(1, 2).is_ok());
        assert_eq!(inv.expect_args(3, 3).unwrap_err().to_string(), "missing arguments");
        assert_eq!(inv.expect_args(0, 1).unwrap_err().to_string(), "too many arguments");
        assert_eq!(inv.arg_or(1, "*"), "b");
        assert_eq!(inv.arg_or(2, "*"), "*");
    }
}
