use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("pull request reference '#{0}' is not a valid number")]
    Malformed(String),
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#(\d+)").expect("valid reference pattern"))
}

/// Pull request numbers referenced as `#123` in commit messages.
///
/// Numbers come back in order of first appearance: message by message, and
/// left to right within a message. Repeats are dropped.
pub fn extract_pr_numbers<I, S>(messages: I) -> Result<Vec<u64>, ReferenceError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut numbers = Vec::new();

    for message in messages {
        for cap in reference_pattern().captures_iter(message.as_ref()) {
            let digits = &cap[1];
            let number = digits
                .parse::<u64>()
                .map_err(|_| ReferenceError::Malformed(digits.to_string()))?;
            if seen.insert(number) {
                numbers.push(number);
            }
        }
    }

    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dedupes_across_messages_in_first_seen_order() {
        let messages = ["fix #12 thing", "merge #12 and #45"];
        assert_eq!(extract_pr_numbers(messages).unwrap(), vec![12, 45]);
    }

    #[test]
    fn extraction_is_repeatable() {
        let messages = vec![
            "Merge pull request #88 from acme/feature".to_string(),
            "Add cache (#12)\n\nFollow-up to #88 and #3".to_string(),
        ];
        let first = extract_pr_numbers(&messages).unwrap();
        let second = extract_pr_numbers(&messages).unwrap();

        assert_eq!(first, vec![88, 12, 3]);
        assert_eq!(first, second);
    }

    #[test]
    fn leading_zeros_collapse_to_the_same_number() {
        assert_eq!(extract_pr_numbers(["#007 then #7"]).unwrap(), vec![7]);
    }

    #[test]
    fn ignores_hashes_without_digits() {
        let messages = ["# Heading", "use C# and #tag", "no refs here"];
        assert_eq!(extract_pr_numbers(messages).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn oversized_reference_is_an_error() {
        let err = extract_pr_numbers(["see #99999999999999999999999"]).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::Malformed("99999999999999999999999".to_string())
        );
    }
}
