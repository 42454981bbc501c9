/*!
`tool.rs` - `kes tool <verb>`: offline key and identity helpers.

  tool identity of <certificate>   identity of a client certificate
  tool identity new <name>         new client key pair and certificate
*/

use std::path::Path;

use crate::cmd::shared::{Invocation, unsupported};
use crate::cmd::{Command, dispatch_verb};
use crate::error::CliError;
use crate::flags::FlagSet;
use crate::tls;

const TOOL_USAGE: &str = "usage: kes tool <command>

    identity             Identity management tools.

  -h, --help             Show this list of command line options.
";

const IDENTITY_USAGE: &str = "usage: kes tool identity <command>

    of                   Compute the identity of a certificate.
    new                  Create a new identity (private key and certificate).

  -h, --help             Show this list of command line options.
";

const OF_USAGE: &str = "usage: kes tool identity of <certificate>";
const NEW_USAGE: &str = "usage: kes tool identity new <name>";

const VERBS: &[Command] = &[Command {
    name: "identity",
    run: identity,
}];

const IDENTITY_VERBS: &[Command] = &[
    Command {
        name: "of",
        run: identity_of,
    },
    Command {
        name: "new",
        run: identity_new,
    },
];

pub fn execute_tool(args: &[String]) -> Result<(), CliError> {
    dispatch_verb(args, VERBS, TOOL_USAGE)
}

fn identity(args: &[String]) -> Result<(), CliError> {
    dispatch_verb(args, IDENTITY_VERBS, IDENTITY_USAGE)
}

fn identity_of(args: &[String]) -> Result<(), CliError> {
    let inv = Invocation::parse(FlagSet::new("tool identity of"), OF_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let path = inv.arg_or(0, "");
    let chain = tls::load_certificates(path)
        .map_err(|e| anyhow::Error::new(e).context("Cannot compute identity"))?;
    crate::log_debug!("{}: {} certificate(s)", path, chain.len());
    Err(unsupported("compute certificate identity", path))
}

fn identity_new(args: &[String]) -> Result<(), CliError> {
    let mut set = FlagSet::new("tool identity new");
    set.string(&["key"], "", "Path to the new private key")
        .string(&["cert"], "", "Path to the new certificate")
        .bool(&["f", "force"], false, "Overwrite existing files");
    let inv = Invocation::parse(set, NEW_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let name = inv.arg_or(0, "");
    if name.is_empty() {
        return Err(inv.usage_error("no identity name specified"));
    }
    let key = match inv.flags.get_str("key") {
        "" => format!("{name}.key"),
        k => k.to_string(),
    };
    let cert = match inv.flags.get_str("cert") {
        "" => format!("{name}.cert"),
        c => c.to_string(),
    };
    if !inv.flags.get_bool("force") {
        for path in [&key, &cert] {
            if Path::new(path).exists() {
                return Err(anyhow::anyhow!("'{path}' already exists (use --force to overwrite)").into());
            }
        }
    }
    Err(unsupported(&format!("create identity '{name}'"), &cert))
}
