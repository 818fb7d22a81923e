//! Shared CLI utilities.

use crate::domain::{Category, RunSummary};
use crate::error::ItemError;

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

pub fn print_per_category(per_category: &std::collections::BTreeMap<Category, usize>) {
    for (category, count) in per_category {
        println!("    {:<13} {}", category.as_str(), count);
    }
}

pub fn print_failures(failures: &[(String, ItemError)]) {
    if failures.is_empty() {
        return;
    }
    println!("  Failures:");
    for (path, err) in failures {
        println!("    {}: {}", path, err);
    }
}

/// Common tail of the normalize and compile summaries.
pub fn print_run_summary(summary: &RunSummary) {
    if !summary.per_category.is_empty() {
        println!("  Per category:");
        print_per_category(&summary.per_category);
    }
    print_failures(&summary.failures);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_trims_and_drops_empty() {
        assert_eq!(parse_csv(&None), None);
        assert_eq!(
            parse_csv(&Some(" personas, ,prompts ".to_string())),
            Some(vec!["personas".to_string(), "prompts".to_string()])
        );
    }
}
