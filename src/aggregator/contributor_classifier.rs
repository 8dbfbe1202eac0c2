use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::github::Commit;

/// Who did the work on a single pull request.
///
/// Logins appear in the order they were first seen in the commit list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorClassification {
    /// Authors with the highest number of non-merge commits.
    pub major_contributors: Vec<String>,
    /// All other authors of non-merge commits.
    pub minor_contributors: Vec<String>,
    /// Authors whose only commits are merge commits, usually base branch syncs.
    pub merge_commit_only_contributors: Vec<String>,
}

pub struct ContributorClassifier;

impl ContributorClassifier {
    pub fn classify(commits: &[Commit]) -> ContributorClassification {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut merge_authors: Vec<&str> = Vec::new();

        for commit in commits {
            let Some(author) = commit.author_login.as_deref() else {
                continue;
            };

            if commit.is_merge() {
                if !merge_authors.contains(&author) {
                    merge_authors.push(author);
                }
            } else if let Some(&slot) = index.get(author) {
                counts[slot].1 += 1;
            } else {
                index.insert(author, counts.len());
                counts.push((author, 1));
            }
        }

        let mut classification = ContributorClassification::default();

        // No counted authors means no maximum, so both buckets stay empty.
        if let Some(max_commits) = counts.iter().map(|(_, count)| *count).max() {
            for (author, count) in &counts {
                if *count == max_commits {
                    classification.major_contributors.push(author.to_string());
                } else {
                    classification.minor_contributors.push(author.to_string());
                }
            }
        }

        classification.merge_commit_only_contributors = merge_authors
            .into_iter()
            .filter(|author| !index.contains_key(author))
            .map(String::from)
            .collect();

        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn commit(author: Option<&str>, parents: usize) -> Commit {
        Commit {
            sha: format!("{:?}-{}", author, parents),
            author_login: author.map(String::from),
            parent_count: parents,
            message: String::new(),
        }
    }

    fn authored(author: &str, times: usize) -> Vec<Commit> {
        (0..times).map(|_| commit(Some(author), 1)).collect()
    }

    fn logins(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn ties_at_the_maximum_are_all_major() {
        let mut commits = authored("alice", 3);
        commits.extend(authored("bob", 3));
        commits.extend(authored("carol", 1));

        let result = ContributorClassifier::classify(&commits);

        assert_eq!(result.major_contributors, logins(&["alice", "bob"]));
        assert_eq!(result.minor_contributors, logins(&["carol"]));
        assert!(result.merge_commit_only_contributors.is_empty());
    }

    #[test]
    fn interleaved_commits_are_counted_per_author() {
        let commits = vec![
            commit(Some("bob"), 1),
            commit(Some("alice"), 1),
            commit(Some("alice"), 1),
            commit(Some("bob"), 1),
            commit(Some("alice"), 1),
        ];

        let result = ContributorClassifier::classify(&commits);

        assert_eq!(result.major_contributors, logins(&["alice"]));
        assert_eq!(result.minor_contributors, logins(&["bob"]));
    }

    #[test]
    fn merge_only_authors_are_called_out() {
        let mut commits = authored("alice", 2);
        commits.push(commit(Some("dave"), 2));
        commits.push(commit(Some("dave"), 2));

        let result = ContributorClassifier::classify(&commits);

        assert_eq!(result.major_contributors, logins(&["alice"]));
        assert_eq!(result.merge_commit_only_contributors, logins(&["dave"]));
    }

    #[test]
    fn merge_author_with_counted_commit_is_not_merge_only() {
        let mut commits = authored("alice", 2);
        commits.push(commit(Some("dave"), 2));
        commits.push(commit(Some("dave"), 1));

        let result = ContributorClassifier::classify(&commits);

        assert_eq!(result.major_contributors, logins(&["alice"]));
        assert_eq!(result.minor_contributors, logins(&["dave"]));
        assert!(result.merge_commit_only_contributors.is_empty());
    }

    #[test]
    fn only_merge_commits_leave_major_and_minor_empty() {
        let commits = vec![
            commit(Some("dave"), 2),
            commit(Some("erin"), 3),
            commit(Some("dave"), 2),
            commit(None, 1),
        ];

        let result = ContributorClassifier::classify(&commits);

        assert_eq!(
            result,
            ContributorClassification {
                major_contributors: vec![],
                minor_contributors: vec![],
                merge_commit_only_contributors: logins(&["dave", "erin"]),
            }
        );
    }

    #[test]
    fn commits_without_identity_are_ignored() {
        let mut commits = vec![commit(None, 1), commit(None, 1), commit(None, 1)];
        commits.push(commit(Some("alice"), 1));

        let result = ContributorClassifier::classify(&commits);

        assert_eq!(result.major_contributors, logins(&["alice"]));
        assert!(result.minor_contributors.is_empty());
    }

    #[test]
    fn no_commits_classifies_nobody() {
        assert_eq!(
            ContributorClassifier::classify(&[]),
            ContributorClassification::default()
        );
    }
}
