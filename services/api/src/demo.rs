use crate::infra::{build_service, ingest_marks, load_catalog, PortalService, SEED_BATCH};
use clap::Args;
use exam_results::config::AppConfig;
use exam_results::error::AppError;
use exam_results::results::{
    BatchId, ComponentKey, ExamResult, IngestOutcome, Mark, RegNumber, ResultCard, ResultEntry,
    SubjectMarksInput,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub(crate) struct BatchArgs {
    /// Catalog JSON with batches, subjects and students (defaults to the seeded batch)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Batch identifier
    #[arg(long, default_value = SEED_BATCH)]
    pub(crate) batch: String,
    /// Marks CSV applied before the command runs (defaults to the seeded marks)
    #[arg(long)]
    pub(crate) marks: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// Marks CSV: `regNumber` then one `CODE_key` column per input component
    pub(crate) file: PathBuf,
    /// Catalog JSON with batches, subjects and students (defaults to the seeded batch)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Batch identifier
    #[arg(long, default_value = SEED_BATCH)]
    pub(crate) batch: String,
}

#[derive(Args, Debug)]
pub(crate) struct StandingsArgs {
    #[command(flatten)]
    pub(crate) source: BatchArgs,
}

#[derive(Args, Debug)]
pub(crate) struct LookupArgs {
    /// Registration number printed on the admit card
    pub(crate) reg_number: String,
    #[command(flatten)]
    pub(crate) source: BatchArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) source: BatchArgs,
    /// Report across every batch in the catalog, with a per-batch comparison
    #[arg(long)]
    pub(crate) all: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the manual edit portion of the demo.
    #[arg(long)]
    pub(crate) skip_edit: bool,
}

pub(crate) fn run_ingest(args: IngestArgs) -> Result<(), AppError> {
    let service = service(args.catalog)?;
    let batch = BatchId(args.batch);
    let outcome = service.ingest_csv(&batch, std::fs::File::open(&args.file)?)?;

    render_outcome(&outcome);
    render_standings(&service.standings(&batch)?);
    Ok(())
}

pub(crate) fn run_standings(args: StandingsArgs) -> Result<(), AppError> {
    let (service, batch) = prepared(args.source)?;
    render_standings(&service.standings(&batch)?);
    Ok(())
}

pub(crate) fn run_lookup(args: LookupArgs) -> Result<(), AppError> {
    let (service, _) = prepared(args.source)?;
    let card = service.lookup(&RegNumber(args.reg_number))?;
    render_card(&card);
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let (service, batch) = prepared(args.source)?;
    let report = if args.all {
        service.overview()?
    } else {
        service.report(&batch)?
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = service(None)?;
    let batch = BatchId::from(SEED_BATCH);

    println!("Exam result portal demo");
    println!("\nBulk upload of the seeded marks");
    let outcome = ingest_marks(&service, &batch, None)?;
    render_outcome(&outcome);
    render_standings(&service.standings(&batch)?);

    if !args.skip_edit {
        println!("\nManual edit: 1040 re-sits LANG and scores 84 written");
        let current = service
            .standings(&batch)?
            .into_iter()
            .find(|result| result.reg_number.as_str() == "1040");
        if let Some(current) = current {
            let subjects = current
                .subject_marks
                .iter()
                .map(|stored| {
                    let mut input = SubjectMarksInput::from(stored);
                    if stored.subject.as_str() == "lang" {
                        input
                            .marks
                            .insert(ComponentKey::from("W"), Mark::Present(84.0));
                    }
                    input
                })
                .collect();
            let edited = service.record(
                &batch,
                ResultEntry {
                    reg_number: current.reg_number.clone(),
                    subjects,
                },
            )?;
            println!(
                "- 1040 now {} / {:.1}% (rank {})",
                edited.grand_total,
                edited.percentage,
                rank_label(edited.rank)
            );
            render_standings(&service.standings(&batch)?);
        }
    }

    println!("\nPublic lookup");
    render_card(&service.lookup(&RegNumber::from("1035"))?);

    let report = service.report(&batch)?;
    println!("\nBatch report");
    println!(
        "- {} results | average {:.1}% | pass rate {:.1}%",
        report.total_results, report.average_percentage, report.pass_rate
    );
    for grade in report.grade_distribution.iter().filter(|entry| entry.count > 0) {
        println!("  - {}: {}", grade.grade, grade.count);
    }
    for subject in &report.subject_performance {
        println!(
            "  - {} average {:.1} ({:.1}%) | pass rate {:.1}%",
            subject.code, subject.average_total, subject.average_percentage, subject.pass_rate
        );
    }

    Ok(())
}

fn service(catalog: Option<PathBuf>) -> Result<Arc<PortalService>, AppError> {
    let config = AppConfig::load()?;
    let catalog = load_catalog(catalog.as_deref())?;
    Ok(build_service(catalog, config.results))
}

fn prepared(source: BatchArgs) -> Result<(Arc<PortalService>, BatchId), AppError> {
    let service = service(source.catalog)?;
    let batch = BatchId(source.batch);
    let outcome = ingest_marks(&service, &batch, source.marks.as_deref())?;
    if !outcome.errors.is_empty() {
        render_outcome(&outcome);
    }
    Ok((service, batch))
}

fn render_outcome(outcome: &IngestOutcome) {
    println!(
        "- {} created | {} updated | {} rejected",
        outcome.created,
        outcome.updated,
        outcome.errors.len()
    );
    for error in &outcome.errors {
        println!("  - row {} ({}): {}", error.row, error.reg_number, error.error);
    }
}

fn render_standings(results: &[ExamResult]) {
    println!("{:>4}  {:<8} {:>8} {:>7}", "Rank", "Reg", "Total", "%");
    for result in results {
        println!(
            "{:>4}  {:<8} {:>8} {:>7.1}",
            rank_label(result.rank),
            result.reg_number,
            result.grand_total,
            result.percentage
        );
    }
}

fn render_card(card: &ResultCard) {
    println!("{} | {} {}", card.exam_title, card.batch_name, card.year);
    println!("{} ({})", card.student_name, card.reg_number);
    for subject in &card.subjects {
        let components: Vec<String> = subject
            .components
            .iter()
            .map(|line| format!("{} {}", line.label, line.value))
            .collect();
        println!(
            "  - {:<5} {:<20} {} | total {}/{}",
            subject.code,
            subject.name,
            components.join(", "),
            subject.total,
            subject.max
        );
    }
    println!(
        "Grand total {}/{} | {:.1}% | grade {} | rank {} | {}",
        card.grand_total,
        card.max_total,
        card.percentage,
        card.grade,
        rank_label(card.rank),
        if card.passed { "PASSED" } else { "FAILED" }
    );
}

fn rank_label(rank: Option<u32>) -> String {
    rank.map(|rank| rank.to_string())
        .unwrap_or_else(|| "-".to_string())
}
