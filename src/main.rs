use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use hf_rankings::analyzer::{self, GroupSummary, HhfTable};
use hf_rankings::logging::init_logging;
use hf_rankings::pipeline::{self, RunReport};
use hf_rankings::store::ArtifactStore;
use hf_rankings::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("hf-rankings")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Cleans classifier score exports and publishes per-division rankings")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml")
                .global(true),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input file, overrides input_file from the configuration")
                .global(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory, overrides output_directory from the configuration")
                .global(true),
        )
        .subcommand(Command::new("process").about("Run the full batch and publish rankings (default)"))
        .subcommand(
            Command::new("best")
                .about("Print the best entry of one classifier/division group")
                .arg(Arg::new("classifier").required(true).help("Classifier code, e.g. 99-11"))
                .arg(Arg::new("division").required(true).help("Division, e.g. \"CARRY OPTICS\"")),
        )
        .subcommand(
            Command::new("summary")
                .about("Summarize published rankings against the official HHF table")
                .arg(
                    Arg::new("classifier")
                        .long("classifier")
                        .value_name("CODE")
                        .help("Only this classifier"),
                )
                .arg(
                    Arg::new("csv")
                        .long("csv")
                        .value_name("FILE")
                        .help("Also write the summary as CSV"),
                ),
        )
        .get_matches();

    init_logging();
    // Global options are visible from the subcommand's matches.
    let scoped = matches.subcommand().map(|(_, sub)| sub).unwrap_or(&matches);
    let config = load_config(scoped)?;

    match matches.subcommand() {
        Some(("best", sub)) => print_best(&config, sub),
        Some(("summary", sub)) => print_summary(&config, sub),
        _ => run_batch(&config).await,
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config
            .save_to_file(config_file)
            .with_context(|| format!("Failed to write configuration: {}", config_file))?;
        default_config
    };

    if let Some(input) = matches.get_one::<String>("input") {
        config.input_file = Some(input.clone());
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_directory = Some(output.clone());
    }
    Ok(config)
}

async fn run_batch(config: &Config) -> Result<()> {
    println!("🔍 Processing classifier scores");
    println!("📄 Output directory: {}", config.output_dir());

    let report = pipeline::run(config).await.context("Batch run failed")?;
    print_report(&report);

    println!("\n✅ Rankings published to {}", config.output_dir());
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("\n📊 SUMMARY");
    println!("==========\n");
    println!("   Rows read:        {}", report.clean.rows_in);
    println!("   Rows dropped:     {}", report.clean.rows_dropped);
    println!("     bad hit factor:      {}", report.clean.bad_hit_factor);
    println!("     unsupported division: {}", report.clean.bad_division);
    println!("     no member number:    {}", report.clean.missing_member_number);
    println!("     bad classifier code: {}", report.clean.bad_classifier_code);
    println!("   Rows retained:    {}", report.clean.rows_retained);
    println!("   Dupes removed:    {}", report.dedupe.dupes);
    println!("   Entries ranked:   {}", report.dedupe.kept);
    println!("   Groups written:   {}", report.groups_written);
}

fn store_for(config: &Config) -> ArtifactStore {
    ArtifactStore::new(config.output_dir(), config.top_n)
}

fn print_best(config: &Config, matches: &ArgMatches) -> Result<()> {
    let classifier = matches
        .get_one::<String>("classifier")
        .context("classifier is required")?;
    let division = matches
        .get_one::<String>("division")
        .context("division is required")?;

    match store_for(config).best(classifier, division)? {
        Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
        None => println!("❓ No entries for {} / {}", classifier, division),
    }
    Ok(())
}

fn print_summary(config: &Config, matches: &ArgMatches) -> Result<()> {
    let store = store_for(config);
    let structure = match matches.get_one::<String>("classifier") {
        Some(classifier) => {
            let divisions = store.load_classifier(classifier)?;
            let mut structure = hf_rankings::store::ProcessedStructure::new();
            if !divisions.is_empty() {
                let code = hf_rankings::normalizer::normalize_code(classifier)
                    .unwrap_or_else(|| classifier.clone());
                structure.insert(code, divisions);
            }
            structure
        }
        None => store.load_all()?,
    };

    let hhfs = match &config.hhf_file {
        Some(path) => Some(
            HhfTable::load_from_file(Path::new(path))
                .with_context(|| format!("Failed to load HHF table: {}", path))?,
        ),
        None => None,
    };

    let summaries = analyzer::summarize(&structure, hhfs.as_ref());
    if summaries.is_empty() {
        println!("❌ No published rankings found in {}", config.output_dir());
        return Ok(());
    }

    println!("📈 Groups (hardest first):");
    for (i, summary) in summaries.iter().enumerate() {
        println!(
            "   {}. {} {} - {} entries, record {}, top-10 avg {}{}",
            i + 1,
            summary.classifier,
            summary.division,
            summary.entries,
            format_hf(summary.record),
            format_hf(summary.top_average),
            match (summary.official_hhf, summary.difficulty, summary.label()) {
                (Some(hhf), Some(d), Some(label)) => format!(", HHF {:.2}, difficulty {}% ({})", hhf, d, label),
                _ => String::new(),
            }
        );
    }

    if let Some(csv_path) = matches.get_one::<String>("csv") {
        write_summary_csv(&summaries, Path::new(csv_path))?;
        println!("\n📄 Summary written to {}", csv_path);
    }
    Ok(())
}

fn format_hf(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn write_summary_csv(summaries: &[GroupSummary], path: &Path) -> Result<()> {
    use csv::Writer;

    let mut writer = Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record([
        "Classifier",
        "Division",
        "Entries",
        "Record",
        "Top10 Average",
        "Official HHF",
        "Difficulty",
        "Label",
        "GM",
        "M",
        "A",
        "B",
        "C",
    ])?;

    for summary in summaries {
        let thresholds = summary.thresholds();
        let opt = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_default();
        writer.write_record([
            summary.classifier.clone(),
            summary.division.clone(),
            summary.entries.to_string(),
            opt(summary.record),
            opt(summary.top_average),
            opt(summary.official_hhf),
            summary.difficulty.map(|d| d.to_string()).unwrap_or_default(),
            summary.label().map(|l| l.to_string()).unwrap_or_default(),
            opt(thresholds.map(|t| t.grand_master)),
            opt(thresholds.map(|t| t.master)),
            opt(thresholds.map(|t| t.a)),
            opt(thresholds.map(|t| t.b)),
            opt(thresholds.map(|t| t.c)),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
