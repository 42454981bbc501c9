/*!
`policy.rs` - `kes policy <verb>`.

  add    [-k] <name> <file>     upload the policy stored in <file>
  show   [-k] <name>            print a policy
  list   [-k] [<pattern>]       list policies (default pattern `*`)
  delete [-k] <name>            remove a policy
*/

use std::path::Path;

use anyhow::Context;

use crate::cmd::shared::{Invocation, client_config, insecure_flag, unsupported};
use crate::cmd::{Command, dispatch_verb};
use crate::error::CliError;
use crate::flags::FlagSet;

const POLICY_USAGE: &str = "usage: kes policy <command>

    add                  Add a new policy.
    show                 Download and print a policy.
    list                 List policies at the key server.
    delete               Delete a policy.

  -h, --help             Show this list of command line options.
";

const ADD_USAGE: &str = "usage: kes policy add [-k] <name> <file>";
const SHOW_USAGE: &str = "usage: kes policy show [-k] <name>";
const LIST_USAGE: &str = "usage: kes policy list [-k] [<pattern>]";
const DELETE_USAGE: &str = "usage: kes policy delete [-k] <name>";

const VERBS: &[Command] = &[
    Command {
        name: "add",
        run: add,
    },
    Command {
        name: "show",
        run: show,
    },
    Command {
        name: "list",
        run: list,
    },
    Command {
        name: "delete",
        run: delete,
    },
];

pub fn execute_policy(args: &[String]) -> Result<(), CliError> {
    dispatch_verb(args, VERBS, POLICY_USAGE)
}

fn parse(verb: &str, header: &str, args: &[String]) -> Result<Invocation, CliError> {
    let mut set = FlagSet::new(format!("policy {verb}"));
    insecure_flag(&mut set);
    Invocation::parse(set, header, args)
}

fn policy_name(inv: &Invocation) -> Result<&str, CliError> {
    match inv.arg_or(0, "") {
        "" => Err(inv.usage_error("no policy name specified")),
        name => Ok(name),
    }
}

fn add(args: &[String]) -> Result<(), CliError> {
    let inv = parse("add", ADD_USAGE, args)?;
    inv.expect_args(2, 2)?;
    let name = policy_name(&inv)?;
    let file = Path::new(inv.arg_or(1, ""));
    let meta = std::fs::metadata(file)
        .with_context(|| format!("cannot read policy file '{}'", file.display()))?;
    if !meta.is_file() {
        return Err(anyhow::anyhow!("policy file '{}' is not a regular file", file.display()).into());
    }
    let cfg = client_config(&inv)?;
    Err(unsupported(&format!("add policy '{name}'"), cfg.server.as_str()))
}

fn show(args: &[String]) -> Result<(), CliError> {
    let inv = parse("show", SHOW_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let name = policy_name(&inv)?;
    let cfg = client_config(&inv)?;
    crate::log_debug!("show policy '{}' (output: {:?})", name, inv.output);
    Err(unsupported(&format!("show policy '{name}'"), cfg.server.as_str()))
}

fn list(args: &[String]) -> Result<(), CliError> {
    let inv = parse("list", LIST_USAGE, args)?;
    inv.expect_args(0, 1)?;
    let pattern = inv.arg_or(0, "*");
    let cfg = client_config(&inv)?;
    Err(unsupported(
        &format!("list policies matching '{pattern}'"),
        cfg.server.as_str(),
    ))
}

fn delete(args: &[String]) -> Result<(), CliError> {
    let inv = parse("delete", DELETE_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let name = policy_name(&inv)?;
    let cfg = client_config(&inv)?;
    Err(unsupported(&format!("delete policy '{name}'"), cfg.server.as_str()))
}
