use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;

use git_gauge::analysis::{AnalysisOptions, AnalyzerConfig, QualityAnalyzer};
use git_gauge::cancel;
use git_gauge::cli::{Cli, Command, OutputFormat};
use git_gauge::diff::GitCliDiffSource;
use git_gauge::git::CommitReader;
use git_gauge::llm::LlmConfig;
use git_gauge::models::{QualityAnalysisResult, TrendReport};
use git_gauge::store::JsonFileStore;
use git_gauge::utils::short_sha;

fn main() {
    env_logger::init();
    cancel::register_handler();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let repo_path = cli.repo.clone();
    let repo_id = match cli.repo_id.clone() {
        Some(id) => id,
        None => repository_id_from_path(&repo_path)?,
    };

    let llm_config = LlmConfig::from_env().with_overrides(cli.model.clone());
    let store = Arc::new(JsonFileStore::new(
        Path::new(&repo_path).join(".git").join("gauge"),
    ));

    let mut config = AnalyzerConfig::default();
    if let Some(ref model) = llm_config.model {
        config.model = model.clone();
    }

    let analyzer = QualityAnalyzer::new(llm_config.create_client(), store).with_config(config);

    match cli.command {
        Command::Analyze {
            days,
            force_refresh,
            basic,
            format,
        } => {
            let commits = CommitReader::with_work_dir(&repo_path).read_commits(days)?;
            println!("Analyzing {} commits from the last {} days", commits.len(), days);

            let analyzer = if basic {
                analyzer
            } else {
                analyzer.with_diff_source(Arc::new(GitCliDiffSource::with_work_dir(&repo_path)))
            };
            let repository_full_name = if basic { None } else { Some(repo_path.as_str()) };

            let options = AnalysisOptions {
                force_refresh,
                model: cli.model,
            };
            let result = analyzer.analyze_quality(
                &commits,
                &repo_id,
                &format!("{}d", days),
                repository_full_name,
                &options,
            );
            print_result(&result, format)?;
        }

        Command::Trends { days, format } => {
            let report = analyzer.quality_trends(&repo_id, days);
            print_trends(&report, format)?;
        }

        Command::CacheKey { days } => {
            let commits = CommitReader::with_work_dir(&repo_path).read_commits(days)?;
            println!(
                "{}",
                analyzer.generate_cache_key(&commits, &repo_id, &format!("{}d", days))
            );
        }

        Command::Prune { older_than_days } => {
            let removed = analyzer.prune_cache(&repo_id, older_than_days);
            println!("Removed {} cached analyses", removed);
        }
    }

    Ok(())
}

/// Derive a stable repository id from the working directory name.
fn repository_id_from_path(repo_path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let canonical = Path::new(repo_path).canonicalize()?;
    Ok(canonical
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repository".to_string()))
}

fn print_result(
    result: &QualityAnalysisResult,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!();
    println!(
        "Quality Score: {:.1}% ({})",
        result.quality_score * 100.0,
        result.analysis_method
    );
    println!(
        "Commits analyzed: {}",
        result.metadata.commits_analyzed
    );

    let quality = &result.metrics.message_quality;
    println!(
        "Messages: {}% conventional, {}% descriptive, {}% vague",
        quality.conventional_percent, quality.descriptive_percent, quality.vague_percent
    );
    println!(
        "Pattern health: {:.1}%",
        result.metrics.pattern_health * 100.0
    );

    if !result.issues.is_empty() {
        println!("\nIssues:");
        for issue in &result.issues {
            let count = issue
                .commit_count
                .map(|c| format!(" ({} commits)", c))
                .unwrap_or_default();
            println!(
                "  [{}] {}: {}{}",
                issue.severity, issue.issue_type, issue.description, count
            );
            if !issue.suggestion.is_empty() {
                println!("      -> {}", issue.suggestion);
            }
        }
    }

    if !result.insights.is_empty() {
        println!("\nInsights:");
        for insight in &result.insights {
            println!("  - {}", insight);
        }
    }

    if !result.recommendations.is_empty() {
        println!("\nRecommendations:");
        for rec in &result.recommendations {
            println!("  - {}", rec);
        }
    }

    if let Some(ref code) = result.code_diff_analysis {
        println!(
            "\nDiff review ({} commits, code score {:.1}%):",
            code.commits_reviewed,
            code.code_score * 100.0
        );
        for analysis in &code.commit_analyses {
            println!(
                "  {} {:.0}% {}",
                short_sha(&analysis.sha),
                analysis.score * 100.0,
                analysis.summary
            );
        }
    }

    Ok(())
}

fn print_trends(
    report: &TrendReport,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Trend: {}", report.direction);
    println!("Average score: {:.1}%", report.average_score * 100.0);
    println!("Score change: {:+.3}", report.score_change);

    for insight in &report.insights {
        println!("  - {}", insight);
    }
    for rec in &report.recommendations {
        println!("  - {}", rec);
    }

    Ok(())
}
