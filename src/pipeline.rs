use crate::cleaner::{CleanStats, RecordCleaner};
use crate::dedupe::{DedupeStats, Deduplicator};
use crate::error::PipelineResult;
use crate::models::Config;
use crate::parser::RecordParser;
use crate::ranking::ClassifierBuckets;
use crate::source;
use crate::store::ArtifactWriter;
use tracing::info;

/// Options for the in-memory part of a run.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    pub delimiter: char,
    pub admit_aliased_divisions: bool,
}

impl From<&Config> for ProcessOptions {
    fn from(config: &Config) -> Self {
        Self {
            delimiter: config.delimiter,
            admit_aliased_divisions: config.admit_aliased_divisions,
        }
    }
}

/// Ranked groups plus the counters gathered on the way.
#[derive(Debug)]
pub struct Processed {
    pub buckets: ClassifierBuckets,
    pub clean: CleanStats,
    pub dedupe: DedupeStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub clean: CleanStats,
    pub dedupe: DedupeStats,
    pub groups_written: usize,
}

/// Parse, clean, dedupe and rank in one pass over the input text.
pub fn process(text: &str, options: ProcessOptions) -> Processed {
    let parser = RecordParser::new(text, options.delimiter);
    let mut cleaner = RecordCleaner::new(options.admit_aliased_divisions);
    let mut dedupe = Deduplicator::new();

    let entries = parser
        .filter_map(|record| cleaner.clean(record))
        .filter(|entry| dedupe.admit(entry));
    let buckets = ClassifierBuckets::build(entries);

    let clean = cleaner.into_stats();
    let dedupe = dedupe.into_stats();
    info!(
        "{} rows in, {} dropped, {} retained",
        clean.rows_in, clean.rows_dropped, clean.rows_retained
    );
    info!("{} dupes removed", dedupe.dupes);
    info!("{} non-dupes remaining", dedupe.kept);

    Processed {
        buckets,
        clean,
        dedupe,
    }
}

/// Full batch run: read input, process it, publish the artifacts.
pub async fn run(config: &Config) -> PipelineResult<RunReport> {
    let text = source::load_input(config).await?;
    let processed = process(&text, ProcessOptions::from(config));

    let writer = ArtifactWriter::new(config.output_dir(), config.top_n);
    let groups_written = writer.publish(processed.buckets).await?;

    Ok(RunReport {
        clean: processed.clean,
        dedupe: processed.dedupe,
        groups_written,
    })
}
