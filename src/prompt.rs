//! Prompt construction for the AI collaborator.
//!
//! Pure text templating: nothing here performs I/O or parsing. The expected
//! response shapes mirror what `analysis::validator` knows how to repair.

use crate::models::CommitRecord;
use crate::utils::short_sha;

/// Build the categorization prompt covering message-level quality for a
/// whole commit batch.
pub fn build_categorization_prompt(commits: &[CommitRecord]) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are reviewing the quality of a repository's commit history.\n\
         Assess the commit messages below for clarity, convention adherence,\n\
         and signs of rushed or debt-accumulating work.\n\n## Commits\n\n",
    );

    for commit in commits {
        prompt.push_str(&format!(
            "- {} ({}): {}\n",
            short_sha(&commit.sha),
            commit.author,
            commit.message.lines().next().unwrap_or("")
        ));
    }

    prompt.push_str(
        "\nRespond with JSON only:\n\
         {\n\
         \t\"quality_score\": <0.0-1.0>,\n\
         \t\"issues\": [{\"type\": \"...\", \"severity\": \"low|medium|high|critical\", \
         \"description\": \"...\", \"suggestion\": \"...\", \"commit_count\": <n>}],\n\
         \t\"insights\": [\"...\"],\n\
         \t\"recommendations\": [\"...\"]\n\
         }\n",
    );

    prompt
}

/// Build the diff review prompt for a single commit. `diff` must already be
/// truncated to the model's budget.
pub fn build_diff_review_prompt(commit: &CommitRecord, diff: &str) -> String {
    format!(
        "You are reviewing a single commit's code changes.\n\n\
         **Commit**: {}\n\
         **Message**:\n```\n{}\n```\n\n\
         **Diff**:\n```diff\n{}\n```\n\n\
         Look for bugs, security problems, missing tests, and good practices.\n\
         Respond with JSON only:\n\
         {{\n\
         \t\"score\": <0.0-1.0>,\n\
         \t\"issues\": [{{\"type\": \"...\", \"severity\": \"low|medium|high|critical\", \
         \"description\": \"...\", \"suggestion\": \"...\", \"line\": <n>}}],\n\
         \t\"positive_practices\": [\"...\"],\n\
         \t\"summary\": \"...\"\n\
         }}\n",
        short_sha(&commit.sha),
        commit.message,
        diff
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn categorization_prompt_lists_all_commits() {
        let commits = vec![
            CommitRecord::new("aaaa111122223333", "feat: add parser", "ada", Utc::now()),
            CommitRecord::new("bbbb111122223333", "fix: null check", "grace", Utc::now()),
        ];
        let prompt = build_categorization_prompt(&commits);
        assert!(prompt.contains("aaaa1111"));
        assert!(prompt.contains("feat: add parser"));
        assert!(prompt.contains("bbbb1111"));
        assert!(prompt.contains("quality_score"));
    }

    #[test]
    fn diff_prompt_embeds_the_diff() {
        let commit = CommitRecord::new("cccc111122223333", "fix: boundary", "ada", Utc::now());
        let prompt = build_diff_review_prompt(&commit, "+let x = 1;");
        assert!(prompt.contains("cccc1111"));
        assert!(prompt.contains("+let x = 1;"));
        assert!(prompt.contains("positive_practices"));
    }
}
