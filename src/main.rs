use anyhow::{Context, Result, bail};
use audit_report::config::{ReportSchema, load_schema};
use audit_report::{MasterOutcome, ReportOptions, ReportPaths, generate_report};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "audit-report",
    version,
    about = "Fill the post-audit report template from a countsheet and a master file",
    long_about = "\
Builds the article-level audit report from a countsheet export:\n\
- keeps countsheet rows with at least one non-zero quantity;\n\
- replicates the template's formatted row once per record, with formulas re-anchored;\n\
- computes verified quantity and INR values per row plus a subtotal row;\n\
- looks the distributor up in the master file and fills the sign-off sheet;\n\
- totals audited value per fiscal quarter (April to March) of manufacture."
)]
struct Args {
    /// Countsheet export (.xlsx/.xls or .csv); row 1 holds the headers
    #[arg(long, value_name = "FILE")]
    countsheet: PathBuf,

    /// Report template containing "Artical level format" and "Sign Format." sheets
    #[arg(long, value_name = "FILE")]
    template: PathBuf,

    /// Master lookup workbook with anchor code and DB name columns
    #[arg(long, value_name = "FILE")]
    master: PathBuf,

    /// Where to write the report; overwritten if it exists
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Optional JSON file overriding template positions and field names
    #[arg(long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Date stamped on the sign-off sheet (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<String>,

    /// Print progress lines to stderr. Without it only the output path is printed.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];
    for f in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, f) {
            return Ok(d);
        }
    }
    bail!("cannot parse date: {s}");
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "audit_report=debug" } else { "audit_report=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let schema = match &args.schema {
        Some(p) => load_schema(p).context("failed to load schema")?,
        None => ReportSchema::default(),
    };
    let mut opts = ReportOptions { schema, ..ReportOptions::default() };
    if let Some(d) = &args.date {
        opts.today = parse_date(d).context("invalid --date")?;
    }

    let paths = ReportPaths {
        countsheet: args.countsheet.clone(),
        template: args.template.clone(),
        master: args.master.clone(),
        output: args.output.clone(),
    };

    let verbose = args.verbose;
    let mut progress = |line: &str| {
        if verbose {
            eprintln!("{line}");
        }
    };
    let summary = generate_report(&paths, &opts, &mut progress)
        .with_context(|| format!("failed to generate report: {}", args.output.display()))?;

    if verbose {
        eprintln!(
            "{} rows written ({} skipped), subtotal on row {}, {} quarter(s)",
            summary.data_rows,
            summary.skipped_rows,
            summary.subtotal_row,
            summary.quarters.len()
        );
    }
    match summary.master {
        MasterOutcome::Matched { .. } => {}
        MasterOutcome::NoMatch => eprintln!("warning: no master row matched; sign-off fields left blank"),
        MasterOutcome::MissingColumns => {
            eprintln!("warning: master file has no anchor code / DB name columns; sign-off fields left blank")
        }
    }

    println!("{}", args.output.display());
    Ok(())
}
