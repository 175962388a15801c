use crate::batch::{BatchConfig, DirMode, Finder};
use crate::change::{split_extension, Change};
use crate::error::{RebatchError, Result};
use crate::traversal::is_hidden;

/// Keep the candidates whose name satisfies the find pattern.
///
/// Directory and hidden-entry rules are applied first; the name is matched
/// without its extension when extensions are ignored.
pub fn find_matches(paths: &[Change], config: &BatchConfig) -> Result<Vec<Change>> {
    let mut matches = Vec::new();

    for change in paths {
        if change.is_dir && !config.dir_mode.includes_dirs() {
            continue;
        }
        if config.dir_mode == DirMode::DirsOnly && !change.is_dir {
            continue;
        }

        let file_name = change.file_name();

        if !config.include_hidden {
            let hidden = is_hidden(file_name, &change.base_dir).map_err(|source| {
                RebatchError::Metadata {
                    path: change.source_path(),
                    source,
                }
            })?;
            if hidden {
                continue;
            }
        }

        let name = if config.ignore_ext {
            split_extension(file_name).0
        } else {
            file_name
        };

        if is_match(name, &config.find) {
            matches.push(change.clone());
        }
    }

    tracing::debug!(
        candidates = paths.len(),
        matched = matches.len(),
        "matched candidates"
    );
    Ok(matches)
}

fn is_match(name: &str, finder: &Finder) -> bool {
    match finder {
        Finder::Regex(regex) => regex.is_match(name),
        Finder::Literal {
            needle,
            ignore_case: true,
            ..
        } => name.to_lowercase().contains(&needle.to_lowercase()),
        Finder::Literal { needle, .. } => name.contains(needle.as_str()),
    }
}

/// Drop candidates whose source path matches any exclusion pattern
pub fn filter_excluded(matches: Vec<Change>, config: &BatchConfig) -> Vec<Change> {
    let Some(exclude) = &config.exclude else {
        return matches;
    };

    let before = matches.len();
    let kept: Vec<Change> = matches
        .into_iter()
        .filter(|change| !exclude.is_match(&change.source))
        .collect();
    tracing::debug!(excluded = before - kept.len(), "applied exclude filter");
    kept
}
