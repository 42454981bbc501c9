/*!
`keys.rs` - master key and data key commands.

  kes create  [-k] <name>
  kes delete  [-k] <name>
  kes derive  [-k] <name> [<context>]
  kes decrypt [-k] <name> <ciphertext> [<context>]

Each command validates its arguments, resolves the key server connection
(KEY_SERVER, client certificate) and then hands over to the key server
protocol.
*/

use crate::cmd::shared::{Invocation, client_config, insecure_flag, unsupported};
use crate::error::CliError;
use crate::flags::FlagSet;

const CREATE_USAGE: &str = "usage: kes create [-k] <name>

Create a new master key with <name> at the key server.";

const DELETE_USAGE: &str = "usage: kes delete [-k] <name>

Delete the master key <name> at the key server.";

const DERIVE_USAGE: &str = "usage: kes derive [-k] <name> [<context>]

Derive a new data key from the master key <name>, bound to the
optional <context>.";

const DECRYPT_USAGE: &str = "usage: kes decrypt [-k] <name> <ciphertext> [<context>]

Decrypt the <ciphertext> of a data key with the master key <name>.
The <context> must match the one used when the key was derived.";

fn parse(name: &str, header: &str, args: &[String]) -> Result<Invocation, CliError> {
    let mut set = FlagSet::new(name);
    insecure_flag(&mut set);
    Invocation::parse(set, header, args)
}

/// Reject an empty key name given as `""`.
fn key_name(inv: &Invocation) -> Result<&str, CliError> {
    match inv.arg_or(0, "") {
        "" => Err(inv.usage_error("no key name specified")),
        name => Ok(name),
    }
}

pub fn execute_create(args: &[String]) -> Result<(), CliError> {
    let inv = parse("create", CREATE_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let name = key_name(&inv)?;
    let cfg = client_config(&inv)?;
    crate::log_debug!("create key '{}'", name);
    Err(unsupported(&format!("create key '{name}'"), cfg.server.as_str()))
}

pub fn execute_delete(args: &[String]) -> Result<(), CliError> {
    let inv = parse("delete", DELETE_USAGE, args)?;
    inv.expect_args(1, 1)?;
    let name = key_name(&inv)?;
    let cfg = client_config(&inv)?;
    crate::log_debug!("delete key '{}'", name);
    Err(unsupported(&format!("delete key '{name}'"), cfg.server.as_str()))
}

pub fn execute_derive(args: &[String]) -> Result<(), CliError> {
    let inv = parse("derive", DERIVE_USAGE, args)?;
    inv.expect_args(1, 2)?;
    let name = key_name(&inv)?;
    let context = inv.arg_or(1, "");
    let cfg = client_config(&inv)?;
    crate::log_debug!(
        "derive data key from '{}' (context: {} bytes, output: {:?})",
        name,
        context.len(),
        inv.output
    );
    Err(unsupported(&format!("derive key from '{name}'"), cfg.server.as_str()))
}

pub fn execute_decrypt(args: &[String]) -> Result<(), CliError> {
    let inv = parse("decrypt", DECRYPT_USAGE, args)?;
    inv.expect_args(2, 3)?;
    let name = key_name(&inv)?;
    if inv.arg_or(1, "").is_empty() {
        return Err(inv.usage_error("no ciphertext specified"));
    }
    let cfg = client_config(&inv)?;
    crate::log_debug!("decrypt data key with '{}' (output: {:?})", name, inv.output);
    Err(unsupported(&format!("decrypt with key '{name}'"), cfg.server.as_str()))
}

/* --------------------------------- Tests ---------------------------------- */
