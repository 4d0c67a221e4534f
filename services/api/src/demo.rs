use crate::infra::FileRecordStore;
use clap::{Args, ValueEnum};
use scorecard::accounts::SignupRequest;
use scorecard::error::AppError;
use scorecard::evaluations::report::{render_csv, render_text, write_csv};
use scorecard::evaluations::{DraftEdit, DraftSetup, RankingSort, ReportDocument, RubricSnapshot};
use scorecard::rubric::{CriterionId, Priority, RubricTemplate, Score, SUBCRITERIA_PER_CRITERION};
use scorecard::scoring::{format_score, SubcriterionWeighting};
use scorecard::ScorecardState;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_FRAMEWORKS: [&str; 3] = ["ITIL", "COBIT", "ISO 27001"];
const DEMO_EVALUATORS: [&str; 2] = ["Ana", "Bruno"];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Framework to evaluate (repeatable). Defaults to ITIL, COBIT, and ISO 27001.
    #[arg(long = "framework")]
    pub(crate) frameworks: Vec<String>,
    /// Rank with priority-weighted subcriteria instead of plain means.
    #[arg(long)]
    pub(crate) prioritized: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Rubric snapshot JSON (the data saved with an evaluation)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Summary)]
    pub(crate) format: ReportFormat,
    /// Write to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    Summary,
    Csv,
    Text,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let frameworks = if args.frameworks.is_empty() {
        DEFAULT_FRAMEWORKS.iter().map(|name| name.to_string()).collect()
    } else {
        args.frameworks
    };
    let weighting = if args.prioritized {
        SubcriterionWeighting::Prioritized
    } else {
        SubcriterionWeighting::Uniform
    };

    let state = ScorecardState::new(Arc::new(FileRecordStore::in_memory()));
    let mut first_submission = None;

    println!("Framework scorecard demo");
    for (round, evaluator) in DEMO_EVALUATORS.iter().enumerate() {
        let username = evaluator.to_lowercase();
        let user = state.accounts.register(SignupRequest {
            name: evaluator.to_string(),
            username: username.clone(),
            email: format!("{username}@demo.local"),
            password: "demo-password".to_string(),
            ..SignupRequest::default()
        })?;

        let draft = state.evaluations.create_draft(
            &user,
            DraftSetup {
                frameworks: frameworks.clone(),
                default_priority: None,
            },
        )?;
        state
            .evaluations
            .edit_draft(&user, draft.id, demo_answers(frameworks.len(), round))?;
        let submitted = state.evaluations.submit_draft(&user, draft.id)?;

        println!(
            "- {} submitted evaluation {} ({})",
            evaluator, submitted.evaluation.id, submitted.evaluation.display_name
        );
        for score in &submitted.scores {
            println!("    {}: {}", score.framework, format_score(score.final_score));
        }
        first_submission.get_or_insert((user, submitted.evaluation.id));
    }

    let ranking = state.evaluations.rankings(weighting, RankingSort::default())?;
    println!("\nRanking ({} subcriteria)", weighting.label());
    for entry in &ranking.entries {
        println!(
            "  {}. {} | {} | {} | {}",
            entry.position, entry.framework, entry.average_score_display, entry.user, entry.date
        );
    }

    println!("\nFramework averages");
    for average in state.evaluations.framework_rankings(weighting)? {
        println!(
            "  {}. {} | {} across {} evaluation(s)",
            average.position, average.framework, average.average_score_display, average.evaluations
        );
    }

    if let Some((user, id)) = first_submission {
        println!("\n{}", state.evaluations.report_text(&user, id)?);
    }

    Ok(())
}

/// Deterministic answers so each demo round ranks the frameworks differently.
fn demo_answers(frameworks: usize, round: usize) -> Vec<DraftEdit> {
    let priorities = Priority::ordered();
    let mut edits = Vec::new();
    for framework in 0..frameworks {
        for criterion in RubricTemplate::standard().criteria() {
            let CriterionId(id) = criterion.id;
            let id = usize::from(id);
            edits.push(DraftEdit::CriterionPriority {
                framework,
                criterion: criterion.id,
                priority: Some(priorities[(id + framework) % priorities.len()]),
            });
            for subcriterion in 0..SUBCRITERIA_PER_CRITERION {
                let value = (framework * 2 + id + subcriterion + round) % usize::from(Score::MAX);
                edits.push(DraftEdit::SubcriterionScore {
                    framework,
                    criterion: criterion.id,
                    subcriterion,
                    score: u8::try_from(value + 1).ok().and_then(|value| Score::new(value).ok()),
                });
                edits.push(DraftEdit::SubcriterionPriority {
                    framework,
                    criterion: criterion.id,
                    subcriterion,
                    priority: Some(priorities[(subcriterion + round) % priorities.len()]),
                });
            }
        }
    }
    edits
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        input,
        format,
        output,
    } = args;

    let raw = fs::read_to_string(&input)?;
    let snapshot = RubricSnapshot::parse(&raw)?;
    let document = ReportDocument::from_snapshot(&snapshot);

    match (format, output) {
        (ReportFormat::Csv, Some(path)) => {
            write_csv(&document, fs::File::create(&path)?)?;
            println!("Report written to {}", path.display());
        }
        (format, Some(path)) => {
            fs::write(&path, render(&document, format)?)?;
            println!("Report written to {}", path.display());
        }
        (format, None) => print!("{}", render(&document, format)?),
    }

    Ok(())
}

fn render(document: &ReportDocument, format: ReportFormat) -> Result<String, AppError> {
    Ok(match format {
        ReportFormat::Summary => render_summary(document),
        ReportFormat::Csv => render_csv(document)?,
        ReportFormat::Text => render_text(document),
    })
}

fn render_summary(document: &ReportDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", document.title);
    for framework in &document.frameworks {
        let _ = writeln!(
            out,
            "\n{}: final score {}",
            framework.framework, framework.final_score_display
        );
        for line in &framework.summary {
            let _ = writeln!(
                out,
                "  - {}: {} ({})",
                line.criterion, line.score_display, line.priority_label
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorecard::evaluations::report::CSV_HEADER;
    use scorecard::evaluations::EvaluationDraft;

    fn answered_snapshot() -> RubricSnapshot {
        let mut draft = EvaluationDraft::new(["ITIL", "COBIT"]).expect("frameworks");
        for edit in demo_answers(2, 0) {
            draft.apply(edit).expect("edit applies");
        }
        draft.snapshot()
    }

    #[test]
    fn demo_answers_complete_every_field() {
        let mut draft = EvaluationDraft::new(["ITIL"]).expect("frameworks");
        for edit in demo_answers(1, 1) {
            draft.apply(edit).expect("edit applies");
        }
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn summary_lists_each_framework_with_its_final_score() {
        let document = ReportDocument::from_snapshot(&answered_snapshot());
        let summary = render_summary(&document);

        assert!(summary.starts_with("Evaluation Report"));
        assert!(summary.contains("ITIL: final score"));
        assert!(summary.contains("COBIT: final score"));
        assert!(summary.contains("  - Cost: "));
    }

    #[test]
    fn csv_format_writes_header_and_rows() {
        let document = ReportDocument::from_snapshot(&answered_snapshot());
        let csv = render(&document, ReportFormat::Csv).expect("csv");
        let header = CSV_HEADER.join(",");
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(header.as_str()));
        assert_eq!(lines.count(), 2 * 60);
    }

    #[test]
    fn report_command_writes_the_output_file() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("scorecard-demo-input-{}.json", std::process::id()));
        let output = dir.join(format!("scorecard-demo-output-{}.txt", std::process::id()));
        fs::write(&input, answered_snapshot().to_json().expect("json")).expect("input");

        run_report(ReportArgs {
            input: input.clone(),
            format: ReportFormat::Text,
            output: Some(output.clone()),
        })
        .expect("report renders");

        let text = fs::read_to_string(&output).expect("output");
        assert!(text.contains("Framework: ITIL"));
        assert!(text.contains("Framework: COBIT"));
        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&output);
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let input = std::env::temp_dir().join(format!("scorecard-demo-empty-{}.json", std::process::id()));
        fs::write(&input, "[]").expect("input");

        let err = run_report(ReportArgs {
            input: input.clone(),
            format: ReportFormat::Summary,
            output: None,
        })
        .expect_err("missing data");
        assert!(err.to_string().contains("invalid or missing"));
        let _ = fs::remove_file(&input);
    }
}
