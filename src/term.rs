//! Terminal detection for interactive-only behavior (prompts, colour, pretty output).

use std::io::IsTerminal;

/// Whether `stream` is attached to an interactive terminal.
///
/// Pipes, redirects and regular files report `false`.
pub fn is_interactive<S: IsTerminal>(stream: &S) -> bool {
    stream.is_terminal()
}

pub fn stdout_is_interactive() -> bool {
    is_interactive(&std::io::stdout())
}

pub fn stderr_is_interactive() -> bool {
    is_interactive(&std::io::stderr())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_file_is_not_a_terminal() {
        let file = tempfile::tempfile().unwrap();
        assert!(!is_interactive(&file));
    }
}
