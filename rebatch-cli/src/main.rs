use clap::{CommandFactory, Parser};
use rebatch_core::{Config, RebatchError};
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;
mod run;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        print_completions(shell, &mut cmd, &mut io::stdout());
        process::exit(0);
    }

    let result = Config::load(dirs::config_dir().as_deref())
        .and_then(|config| run::handle_run(&cli, &config));

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code(&e));
        },
    }
}

/// Logs go to stderr; stdout carries tables and JSON only
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("rebatch=debug,rebatch_core=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

// Print shell completions
fn print_completions<G: clap_complete::Generator>(
    gen: G,
    cmd: &mut clap::Command,
    out: &mut dyn Write,
) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(gen, cmd, name, out);
}

/// 1 = conflicts, 2 = invalid input, 3 = the batch ran but renames failed
fn exit_code(error: &anyhow::Error) -> i32 {
    let Some(error) = error.downcast_ref::<RebatchError>() else {
        return 1;
    };

    match error {
        RebatchError::Conflicts(_) => 1,
        e if e.is_usage_error() => 2,
        RebatchError::PartialFailure { .. }
        | RebatchError::AllFailed { .. }
        | RebatchError::JournalUnsaved { .. }
        | RebatchError::JournalRead { .. }
        | RebatchError::JournalParse { .. }
        | RebatchError::Metadata { .. } => 3,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_complete::Shell;
    use rebatch_core::ConflictReport;
    use std::path::PathBuf;

    #[test]
    fn test_print_completions_bash() {
        let mut cmd = Cli::command();
        let mut out = Vec::new();

        print_completions(Shell::Bash, &mut cmd, &mut out);

        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("rebatch"));
        assert!(script.contains("--fix-conflicts"));
    }

    #[test]
    fn test_print_completions_zsh() {
        let mut cmd = Cli::command();
        let mut out = Vec::new();

        print_completions(Shell::Zsh, &mut cmd, &mut out);

        assert!(!out.is_empty());
    }

    #[test]
    fn test_exit_codes() {
        let conflicts = anyhow::Error::from(RebatchError::Conflicts(ConflictReport::default()));
        assert_eq!(exit_code(&conflicts), 1);

        let usage = anyhow::Error::from(RebatchError::MissingArgument);
        assert_eq!(exit_code(&usage), 2);

        let partial = anyhow::Error::from(RebatchError::PartialFailure {
            recovery_file: PathBuf::from(".f2_x.json"),
            failed: 1,
        });
        assert_eq!(exit_code(&partial), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("config unreadable")), 1);
    }
}
