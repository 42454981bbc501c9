/*!
`identity.rs` - `kes identity <verb>`.

  assign [-k] <identity> <policy>   bind an identity to a policy
  list   [-k] [<pattern>]           list identities (default pattern `*`)
  forget [-k] <identity>            remove an identity
*/

use crate::cmd::shared::{Invocation, client_config, insecure_flag, unsupported};
use crate::cmd::{Command, dispatch_verb};
use crate::error::CliError;
use crate::flags::FlagSet;

const IDENTITY_USAGE: &str = "usage: kes identity <command>

    assign               Assign an identity to a policy.
    list                 List identities at the key server.
    forget               Forget an identity.

  -h, --help             Show this list of command line options.
";

const ASSIGN_USAGE: &str = "usage: kes identity assign [-k] <identity> <policy>";
const LIST_USAGE: &str = "usage: kes identity list [-k] [<pattern>]";
const FORGET_USAGE: &str = "usage: kes identity forget [-k] <identity>";

const VERBS: &[Command] = &[
    Command {
        name: "assign",
        run: assign,
    },
    Command {
        name: "list",
        run: list,
    },
    Command {
        name: "forget",
        run: forget,
    },
];

pub fn execute_identity(args: &[String]) -> Result<(), CliError> {
    dispatch_verb(args, VERBS, IDENTITY_USAGE)
}

fn parse(verb: &str, header: &str, args: &[String]) -> Result<Invocation, CliError> {
    let mut set = FlagSet::new(format!("identity {verb}"));
    insecure_flag(&mut set);
    Invocation::parse(set, header, args)
}

fn assign(args: &[String]) -> Result<(), CliError> {
    let inv = parse("assign", ASSIGN_USAGE, args)?;
    inv.expect_args(2, 2)?;
    let (identity, policy) = (inv.arg_or(0, ""), inv.arg_or(1, ""));
    if identity.is_empty() {
        return Err(inv.usage_error("no identity specified"));
    }
    if policy.is_empty() {
        return Err(inv.usage_error("no policy specified"));
    }
    let cfg = client_config(&inv)?;
    Err(unsupported(
        &format!("assign identity '{identity}' to policy '{policy}'"),
        cfg.server.as_str(),
    ))
}

fn list(args: &[String]) -> Result<(), CliError> {
    let inv = parse("list", LIST_USAGE, args)?;
    inv.expect_args(0, 1)?;
    let pattern = inv.arg_or(0, "*");
    let cfg = client_config(&inv)?;
    crate::log_debug!("list identities matching '{}' (output: {:?})", pattern, inv.output);
    Err(unsupported(
        &format!("list identities matching '{pattern}'"),
        cfg.server.as_str(),
    ))
}

fn forget(args: &[String]) -> Result<(), CliError> {
    let inv = parse("forget", FORGET_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let identity = inv.arg_or(0, "");
    if identity.is_empty() {
        return Err(inv.usage_error("no identity specified"));
    }
    let cfg = client_config(&inv)?;
    Err(unsupported(
        &format!("forget identity '{identity}'"),
        cfg.server.as_str(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn verb_is_required() {
        let err = execute_identity(&args(&["identity"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = execute_identity(&args(&["identity", "rename"])).unwrap_err();
        assert!(err.to_string().contains("unknown command 'rename'"));
    }

    #[test]
    fn assign_needs_identity_and_policy() {
        let err = execute_identity(&args(&["identity", "assign", "-k", "abc"])).unwrap_err();
        assert_eq!(err.to_string(), "missing arguments");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn verb_help() {
        let err = execute_identity(&args(&["identity", "forget", "--help"])).unwrap_err();
        assert!(matches!(err, CliError::Help(ref u) if u.starts_with(FORGET_USAGE)));
    }
}
