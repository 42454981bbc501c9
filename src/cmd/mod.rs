/*!
Command dispatcher.

`main` parses the top-level flags (only `-h/--help`) and hands the remaining
arguments to `dispatch`, which looks the first one up in a static `Command`
table and calls its handler with the full slice, command name included:

```text
kes create -k my-key      ->  execute_create(["create", "-k", "my-key"])
```

Handlers re-parse their own flags (see `flags::split_flags`). Nested verbs
(`kes identity assign ...`) reuse `dispatch` with their own table.

Layout:
  src/cmd/
    mod.rs       (this file: Command, dispatch, top-level usage)
    shared.rs    (flag set / output mode / client config setup for handlers)
    server.rs    (server)
    keys.rs      (create, delete, derive, decrypt)
    identity.rs  (identity assign|list|forget)
    policy.rs    (policy add|show|list|delete)
    tool.rs      (tool identity of|new)

Conventions:
  - Each handler is `fn(&[String]) -> Result<(), CliError>` named `execute_*`.
  - Handlers never exit the process; `main` reports the returned error.
*/

use std::path::Path;

use crate::error::CliError;

pub mod identity;
pub mod keys;
pub mod policy;
pub mod server;
pub mod shared;
pub mod tool;

pub use identity::execute_identity;
pub use keys::{execute_create, execute_decrypt, execute_delete, execute_derive};
pub use policy::execute_policy;
pub use server::execute_server;
pub use tool::execute_tool;

/// Entry point of a command. Receives its own name at index 0.
pub type Handler = fn(&[String]) -> Result<(), CliError>;

/// One row of a dispatch table.
#[derive(Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub run: Handler,
}

/// Top-level commands of `kes`.
pub const COMMANDS: &[Command] = &[
    Command {
        name: "server",
        run: execute_server,
    },
    Command {
        name: "create",
        run: execute_create,
    },
    Command {
        name: "delete",
        run: execute_delete,
    },
    Command {
        name: "derive",
        run: execute_derive,
    },
    Command {
        name: "decrypt",
        run: execute_decrypt,
    },
    Command {
        name: "identity",
        run: execute_identity,
    },
    Command {
        name: "policy",
        run: execute_policy,
    },
    Command {
        name: "tool",
        run: execute_tool,
    },
];

/// Top-level usage for program `prog`.
pub fn usage(prog: &str) -> String {
    format!(
        "usage: {prog} <command>

    server               Start a key server.

    create               Create a new master key at a key server.
    delete               Delete a master key from a key server.

    derive               Derives a new data key from a master key.
    decrypt              Decrypt a encrypted data key using a master key.

    identity             Assign policies to identities.
    policy               Manage the key server policies.

    tool                 Run specific key and identity management tools.

  -h, --help             Show this list of command line options.
"
    )
}

/// Base name of `argv[0]`, `kes` when unavailable.
pub fn program_name(argv0: Option<&str>) -> String {
    argv0
        .and_then(|a| Path::new(a).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("kes")
        .to_string()
}

pub fn lookup<'a>(commands: &'a [Command], name: &str) -> Option<&'a Command> {
    commands.iter().find(|c| c.name == name)
}

/// Route `args` by its first element.
///
/// No arguments, or an unknown first argument, is a usage error.
pub fn dispatch(args: &[String], commands: &[Command], usage: &str) -> Result<(), CliError> {
    let Some(name) = args.first() else {
        return Err(CliError::Usage {
            usage: usage.to_string(),
            reason: None,
        });
    };
    match lookup(commands, name) {
        Some(cmd) => {
            crate::log_trace!("dispatch: {} {:?}", cmd.name, &args[1..]);
            (cmd.run)(args)
        }
        None => Err(CliError::usage(usage, format!("unknown command '{name}'"))),
    }
}

/// Route a command with nested verbs (`kes identity assign ...`).
///
/// `args[0]` is the command itself; `-h` in verb position yields `usage`.
pub fn dispatch_verb(args: &[String], verbs: &[Command], usage: &str) -> Result<(), CliError> {
    match args.get(1).map(String::as_str) {
        Some("-h" | "-help" | "--help") => Err(CliError::Help(usage.to_string())),
        _ => dispatch(args.get(1..).unwrap_or_default(), verbs, usage),
    }
}

/* --------------------------------- Tests ---------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CALLS: RefCell<Vec<(&'static str, Vec<String>)>> = const { RefCell::new(Vec::new()) };
    }

    macro_rules! recording {
        ($($fn_name:ident => $label:literal),* $(,)?) => {
            $(
                fn $fn_name(args: &[String]) -> Result<(), CliError> {
                    CALLS.with(|c| c.borrow_mut().push(($label, args.to_vec())));
                    Ok(())
                }
            )*
            const RECORDING: &[Command] = &[
                $(Command { name: $label, run: $fn_name }),*
            ];
        };
    }

    recording! {
        rec_server => "server",
        rec_create => "create",
        rec_delete => "delete",
        rec_derive => "derive",
        rec_decrypt => "decrypt",
        rec_identity => "identity",
        rec_policy => "policy",
        rec_tool => "tool",
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn take_calls() -> Vec<(&'static str, Vec<String>)> {
        CALLS.with(|c| std::mem::take(&mut *c.borrow_mut()))
    }

    #[test]
    fn empty_args_is_usage_error() {
        let err = dispatch(&[], RECORDING, "usage").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(take_calls().is_empty());
    }

    #[test]
    fn unknown_command_is_usage_error() {
        let err = dispatch(&args(&["rotate", "x"]), RECORDING, "usage").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("unknown command 'rotate'"));
        assert!(take_calls().is_empty());
    }

    #[test]
    fn each_command_reaches_only_its_handler() {
        for cmd in RECORDING {
            let input = args(&[cmd.name, "-k", "value"]);
            dispatch(&input, RECORDING, "usage").unwrap();
            assert_eq!(take_calls(), vec![(cmd.name, input)]);
        }
    }

    #[test]
    fn server_help_is_routed_to_server() {
        let input = args(&["server", "-h"]);
        dispatch(&input, RECORDING, "usage").unwrap();
        assert_eq!(take_calls(), vec![("server", input)]);
    }

    #[test]
    fn table_covers_all_commands() {
        let names: Vec<_> = COMMANDS.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            [
                "server", "create", "delete", "derive", "decrypt", "identity", "policy", "tool"
            ]
        );
        let text = usage("kes");
        for name in names {
            assert!(text.contains(&format!("    {name} ")), "usage lists {name}");
        }
    }

    #[test]
    fn verbs_skip_the_command_name() {
        let input = args(&["tool", "create", "--json"]);
        dispatch_verb(&input, RECORDING, "usage").unwrap();
        assert_eq!(take_calls(), vec![("create", args(&["create", "--json"]))]);

        let err = dispatch_verb(&args(&["tool"]), RECORDING, "usage").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = dispatch_verb(&args(&["tool", "--help"]), RECORDING, "usage").unwrap_err();
        assert_eq!(err.exit_code(), 0);
        assert!(take_calls().is_empty());
    }

    #[test]
    fn usage_uses_program_base_name() {
        assert_eq!(program_name(Some("/usr/local/bin/kes")), "kes");
        assert_eq!(program_name(None), "kes");
        assert!(usage("kes-dev").starts_with("usage: kes-dev <command>\n"));
    }
}
