use anyhow::{Context, Result};
use rebatch_core::{
    candidates, list_entries, rename_operation, should_use_color, undo_operation, AnsiFormatter,
    BatchConfig, BatchOptions, BuiltinVariables, Config, Formatter, OutputFormatter,
    PlainFormatter, RunResult, SortKey, TableReporter, WalkOptions,
};
use std::io;

use crate::cli::{Cli, OutputFormat};

pub fn handle_run(cli: &Cli, config: &Config) -> Result<()> {
    let json = cli.output == OutputFormat::Json;
    let mut options = batch_options(cli);
    config.apply_to(&mut options);
    tracing::debug!(defaults = ?config.defaults, "applied config defaults");
    // Tables would corrupt the JSON document on stdout
    options.quiet |= json;
    let batch = BatchConfig::new(options)?;

    let use_color = !cli.no_color && should_use_color(config.defaults.use_color);
    let result = if use_color {
        run_batch(cli, &batch, AnsiFormatter)?
    } else {
        run_batch(cli, &batch, PlainFormatter)?
    };

    if json {
        println!("{}", result.format(cli.output.into()));
    } else if !batch.quiet && !result.mode.is_dry_run() && !result.changes.is_empty() {
        print!("{}", result.format_summary());
    }
    Ok(())
}

fn run_batch<F: Formatter>(cli: &Cli, batch: &BatchConfig, formatter: F) -> Result<RunResult> {
    let mut reporter = TableReporter::new(io::stdout(), formatter);

    if batch.is_undo() {
        return Ok(undo_operation(batch, &mut reporter)?);
    }

    let walk = WalkOptions {
        recursive: cli.recursive,
        max_depth: cli.max_depth,
        include_hidden: batch.include_hidden,
    };
    let listing = list_entries(&cli.paths, &walk).context("Failed to read directories")?;
    let result = rename_operation(
        &candidates(&listing),
        batch,
        &BuiltinVariables::default(),
        &mut reporter,
    )?;
    Ok(result)
}

/// Options as given on the command line, before config defaults
fn batch_options(cli: &Cli) -> BatchOptions {
    let (sort, reverse_sort) = match (cli.sort, cli.sortr) {
        (Some(key), _) => (Some(SortKey::from(key)), false),
        (None, Some(key)) => (Some(SortKey::from(key)), true),
        (None, None) => (None, false),
    };

    BatchOptions {
        find: cli.find.clone().unwrap_or_default(),
        replace: cli.replace.clone().unwrap_or_default(),
        undo_file: cli.undo.clone(),
        start_number: cli.start_num,
        exec: cli.exec,
        fix_conflicts: cli.fix_conflicts,
        include_dir: cli.include_dir,
        only_dir: cli.only_dir,
        include_hidden: cli.hidden,
        ignore_case: cli.ignore_case,
        ignore_ext: cli.ignore_ext,
        string_mode: cli.string_mode,
        exclude: cli.exclude.clone(),
        sort,
        reverse_sort,
        output_file: cli.output_file.clone(),
        quiet: cli.quiet,
        ..BatchOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_sortr_sets_reverse() {
        let cli = Cli::try_parse_from(["rebatch", "-f", "a", "--sortr", "size"]).unwrap();
        let options = batch_options(&cli);
        assert_eq!(options.sort, Some(SortKey::Size));
        assert!(options.reverse_sort);

        let cli = Cli::try_parse_from(["rebatch", "-f", "a", "--sort", "btime"]).unwrap();
        let options = batch_options(&cli);
        assert_eq!(options.sort, Some(SortKey::Birth));
        assert!(!options.reverse_sort);
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "rebatch", "-f", "x", "-r", "y", "-F", "-D", "-H", "-i", "-e", "-s", "-q", "-n", "10",
        ])
        .unwrap();
        let options = batch_options(&cli);

        assert_eq!(options.find, "x");
        assert_eq!(options.replace, "y");
        assert!(options.fix_conflicts);
        assert!(options.only_dir);
        assert!(options.include_hidden);
        assert!(options.ignore_case);
        assert!(options.ignore_ext);
        assert!(options.string_mode);
        assert!(options.quiet);
        assert_eq!(options.start_number, 10);
        assert!(!options.exec);
    }
}
