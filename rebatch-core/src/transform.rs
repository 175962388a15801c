use crate::batch::{BatchConfig, Finder, TransformMode};
use crate::change::{join_name, split_dir, split_extension, Change};
use crate::error::Result;
use crate::numbering::{expand_numbering, has_numbering};
use crate::variables::VariableExpander;
use regex::{Captures, Regex};

/// Compute the target of every matched candidate.
///
/// Candidates must already be in their final order: the position of each
/// one is the index used for numbering tokens. On error no target is kept.
pub fn apply_transform(
    changes: &mut [Change],
    config: &BatchConfig,
    expander: &dyn VariableExpander,
) -> Result<()> {
    let mut targets = Vec::with_capacity(changes.len());

    for (index, change) in changes.iter().enumerate() {
        targets.push(compute_target(change, index, config, expander)?);
    }

    for (change, target) in changes.iter_mut().zip(targets) {
        change.target = target;
    }

    tracing::debug!(count = changes.len(), "computed targets");
    Ok(())
}

fn compute_target(
    change: &Change,
    index: usize,
    config: &BatchConfig,
    expander: &dyn VariableExpander,
) -> Result<String> {
    let (dir, file_name) = split_dir(&change.source);
    let (name, ext) = if config.ignore_ext {
        split_extension(file_name)
    } else {
        (file_name, "")
    };

    let replaced = replace_name(name, &config.find, &config.transform);
    let expanded = expander.expand(&replaced, change)?;
    let mut new_name = if has_numbering(&expanded) {
        expand_numbering(&expanded, config.start_number, index)?
    } else {
        expanded
    };
    new_name.push_str(ext);

    Ok(join_name(dir, &new_name))
}

/// Apply the find/replace step to one name
pub fn replace_name(name: &str, finder: &Finder, mode: &TransformMode) -> String {
    let replacement = match mode {
        TransformMode::Substitute(replacement) => replacement,
        TransformMode::UppercaseMatches => {
            return map_matches(name, finder.regex(), str::to_uppercase);
        },
        TransformMode::LowercaseMatches => {
            return map_matches(name, finder.regex(), str::to_lowercase);
        },
        TransformMode::TitlecaseMatches => {
            return map_matches(name, finder.regex(), title_case);
        },
    };

    match finder {
        Finder::Literal {
            needle,
            ignore_case: false,
            ..
        } if !needle.is_empty() => name.replace(needle.as_str(), replacement),
        // Escaped literal needles carry no capture groups, so `$` in the
        // replacement must stay literal
        Finder::Literal { regex, .. } => regex
            .replace_all(name, regex::NoExpand(replacement))
            .into_owned(),
        Finder::Regex(regex) => regex.replace_all(name, replacement.as_str()).into_owned(),
    }
}

fn map_matches(name: &str, regex: &Regex, f: impl Fn(&str) -> String) -> String {
    regex
        .replace_all(name, |caps: &Captures| f(&caps[0]))
        .into_owned()
}

/// Lowercase the text, then capitalize the first letter of every word
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphanumeric() && c != '\'';
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchOptions;
    use crate::error::RebatchError;
    use crate::variables::NoVariables;
    use std::path::MAIN_SEPARATOR;

    fn config(find: &str, replace: &str) -> BatchConfig {
        BatchConfig::new(BatchOptions {
            find: find.to_string(),
            replace: replace.to_string(),
            ..BatchOptions::default()
        })
        .unwrap()
    }

    fn transform(names: &[&str], config: &BatchConfig) -> Result<Vec<String>> {
        let mut changes: Vec<_> = names
            .iter()
            .map(|name| Change::new(".", name, false))
            .collect();
        apply_transform(&mut changes, config, &NoVariables)?;
        Ok(changes.into_iter().map(|c| c.target).collect())
    }

    #[test]
    fn test_regex_replacement_with_groups() {
        let config = config(r"(\w+)-(\d+)", "${2}_$1");
        let targets = transform(&["photo-12.jpg"], &config).unwrap();
        assert_eq!(targets, vec!["12_photo.jpg"]);
    }

    #[test]
    fn test_extension_swap() {
        let config = config(r"\.txt$", ".md");
        let targets = transform(&["a.txt", "b.txt"], &config).unwrap();
        assert_eq!(targets, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_string_mode_is_literal() {
        let config = BatchConfig::new(BatchOptions {
            find: "(1)".to_string(),
            replace: "$1".to_string(),
            string_mode: true,
            ..BatchOptions::default()
        })
        .unwrap();
        let targets = transform(&["copy (1).txt"], &config).unwrap();
        assert_eq!(targets, vec!["copy $1.txt"]);
    }

    #[test]
    fn test_string_mode_ignore_case_keeps_replacement_literal() {
        let config = BatchConfig::new(BatchOptions {
            find: "IMG".to_string(),
            replace: "$x".to_string(),
            string_mode: true,
            ignore_case: true,
            ..BatchOptions::default()
        })
        .unwrap();
        let targets = transform(&["img_1.png"], &config).unwrap();
        assert_eq!(targets, vec!["$x_1.png"]);
    }

    #[test]
    fn test_case_transforms_apply_to_matches_only() {
        let upper = transform(&["abc-def.txt"], &config("abc", r"\Cu")).unwrap();
        assert_eq!(upper, vec!["ABC-def.txt"]);

        let lower = transform(&["ABC-DEF.TXT"], &config(r"\.TXT", r"\Cl")).unwrap();
        assert_eq!(lower, vec!["ABC-DEF.txt"]);

        let title = transform(&["hello WORLD.txt"], &config(r"^[^.]+", r"\Ct")).unwrap();
        assert_eq!(title, vec!["Hello World.txt"]);
    }

    #[test]
    fn test_ignore_ext_reappends_extension() {
        let config = BatchConfig::new(BatchOptions {
            find: ".*".to_string(),
            replace: "renamed".to_string(),
            ignore_ext: true,
            ..BatchOptions::default()
        })
        .unwrap();
        let targets = transform(&["a.tar.gz"], &config).unwrap();
        assert_eq!(targets, vec!["renamed.gz"]);
    }

    #[test]
    fn test_numbering_uses_position() {
        let config = config(r".*\.jpg", "file_%03d.jpg");
        let targets = transform(&["x.jpg", "y.jpg", "z.jpg"], &config).unwrap();
        assert_eq!(targets, vec!["file_001.jpg", "file_002.jpg", "file_003.jpg"]);
    }

    #[test]
    fn test_replacement_can_introduce_directories() {
        let config = config(r"^(\d{4})-", "$1/");
        let targets = transform(&["2023-trip.jpg"], &config).unwrap();
        assert_eq!(targets, vec![format!("2023{}trip.jpg", MAIN_SEPARATOR)]);
    }

    #[test]
    fn test_nested_source_keeps_directory() {
        let mut changes = vec![Change::new(".", "sub/a.txt", false)];
        apply_transform(&mut changes, &config("a", "b"), &NoVariables).unwrap();
        assert_eq!(changes[0].target, format!("sub{}b.txt", MAIN_SEPARATOR));
    }

    #[test]
    fn test_empty_result_stays_empty() {
        let targets = transform(&["abc"], &config("abc", "")).unwrap();
        assert_eq!(targets, vec![""]);
    }

    #[test]
    fn test_bad_token_aborts_without_partial_targets() {
        let config = config(".*", "%d0");
        let mut changes = vec![Change::new(".", "a", false)];
        let err = apply_transform(&mut changes, &config, &NoVariables).unwrap_err();
        assert!(matches!(err, RebatchError::InvalidNumbering { .. }));
        assert!(changes[0].target.is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("the QUICK brown-fox"), "The Quick Brown-Fox");
        assert_eq!(title_case("don't stop"), "Don't Stop");
    }
}
