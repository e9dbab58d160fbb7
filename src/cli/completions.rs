//! Completion scripts for `scrivener completions <SHELL>`

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io::{self, Write};

use crate::cli::args::Cli;
use crate::APP_NAME;

/// Write the completion script for `shell` into `out`
pub fn write_to(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, APP_NAME, out);
}

pub fn print(shell: Shell) {
    write_to(shell, &mut io::stdout());
}
