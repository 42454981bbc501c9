use clap::Parser;

use kes::cmd;
use kes::error::{self, CliError};
use kes::utils;

/// kes - key management client and server.
///
/// Layout:
///   kes <command> [args...]
///
/// Only `-h/--help` is accepted before the command; everything after the
/// command name (including further flags) belongs to the command and is
/// parsed by its own handler:
///   kes server -h            server usage, not the global one
///   kes create my-key -k     flags may follow positionals
///
/// Environment:
///   KEY_SERVER                 key server URL (default https://127.0.0.1:7373)
///   KEY_CLIENT_TLS_CERT_FILE   client certificate for mTLS
///   KEY_CLIENT_TLS_KEY_FILE    client private key for mTLS
///   KES_LOG_LEVEL              error | info | debug | trace
#[derive(Parser, Debug)]
#[command(
    name = "kes",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
struct Cli {
    /// Show this list of command line options
    #[arg(short = 'h', long = "help")]
    help: bool,

    /// Command followed by its own arguments
    #[arg(trailing_var_arg = true, num_args = 1.., value_name = "COMMAND")]
    args: Vec<String>,
}

fn main() {
    let argv: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    utils::init_logging(utils::level_from_env());

    let usage = cmd::usage(&cmd::program_name(argv.first().map(String::as_str)));
    let result = match Cli::try_parse_from(&argv) {
        Ok(cli) if cli.help => Err(CliError::Help(usage)),
        Ok(cli) => cmd::dispatch(&cli.args, cmd::COMMANDS, &usage),
        Err(e) => Err(CliError::from_clap(e, usage)),
    };

    if let Err(err) = result {
        error::exit(err);
    }
}
