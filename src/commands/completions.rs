//! Command: generate shell completions.
use clap::CommandFactory;
use std::io::Write;

use crate::cli::{Cli, CompletionsOpts};

/// Write a completion script for `opts.shell` to `out`.
pub fn run(opts: &CompletionsOpts, out: &mut impl Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(opts.shell, &mut command, name, out);
}
