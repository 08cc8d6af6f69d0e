use crate::models::strip_whitespace;
use crate::store::ProcessedStructure;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Number of leading entries averaged for the difficulty estimate.
pub const TOP_AVERAGE_WINDOW: usize = 10;

/// Official high hit factors: classifier -> division -> HHF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HhfTable(BTreeMap<String, BTreeMap<String, f64>>);

impl HhfTable {
    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Division keys compare with whitespace removed and upper-cased, so
    /// `CARRY OPTICS` and `CARRYOPTICS` are the same group.
    pub fn lookup(&self, classifier: &str, division: &str) -> Option<f64> {
        let wanted = division_key(division);
        self.0
            .get(classifier)?
            .iter()
            .find(|(name, _)| division_key(name) == wanted)
            .map(|(_, hhf)| *hhf)
    }
}

impl FromIterator<(String, String, f64)> for HhfTable {
    fn from_iter<I: IntoIterator<Item = (String, String, f64)>>(iter: I) -> Self {
        let mut table: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for (classifier, division, hhf) in iter {
            table.entry(classifier).or_default().insert(division, hhf);
        }
        Self(table)
    }
}

fn division_key(division: &str) -> String {
    strip_whitespace(division).to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyLabel {
    Easy,
    Fair,
    Hard,
    VeryHard,
    Insane,
    Impossible,
}

impl DifficultyLabel {
    pub fn from_percent(difficulty: u32) -> Self {
        match difficulty {
            d if d >= 135 => DifficultyLabel::Impossible,
            d if d >= 120 => DifficultyLabel::Insane,
            d if d >= 110 => DifficultyLabel::VeryHard,
            d if d >= 102 => DifficultyLabel::Hard,
            d if d >= 94 => DifficultyLabel::Fair,
            _ => DifficultyLabel::Easy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLabel::Easy => "easy",
            DifficultyLabel::Fair => "fair",
            DifficultyLabel::Hard => "hard",
            DifficultyLabel::VeryHard => "very-hard",
            DifficultyLabel::Insane => "insane",
            DifficultyLabel::Impossible => "impossible",
        }
    }
}

impl fmt::Display for DifficultyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification hit factors derived from the official HHF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassThresholds {
    pub grand_master: f64,
    pub master: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl ClassThresholds {
    pub fn from_hhf(hhf: f64) -> Self {
        Self {
            grand_master: hhf * 0.95,
            master: hhf * 0.85,
            a: hhf * 0.75,
            b: hhf * 0.60,
            c: hhf * 0.40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub classifier: String,
    pub division: String,
    pub entries: usize,
    /// Best hit factor on file.
    pub record: Option<f64>,
    pub top_average: Option<f64>,
    pub official_hhf: Option<f64>,
    /// `100 * HHF / top average`, truncated.
    pub difficulty: Option<u32>,
}

impl GroupSummary {
    pub fn label(&self) -> Option<DifficultyLabel> {
        self.difficulty.map(DifficultyLabel::from_percent)
    }

    pub fn thresholds(&self) -> Option<ClassThresholds> {
        self.official_hhf.map(ClassThresholds::from_hhf)
    }
}

fn hit_factor(entry: &Value) -> f64 {
    entry.get("hit_factor").and_then(Value::as_f64).unwrap_or(0.0)
}

/// The sum of the first ten hit factors over ten, even when the group is
/// shorter; small groups read as easier.
pub fn top_average(ranked: &[Value]) -> Option<f64> {
    if ranked.is_empty() {
        return None;
    }
    let sum: f64 = ranked.iter().take(TOP_AVERAGE_WINDOW).map(hit_factor).sum();
    Some(sum / TOP_AVERAGE_WINDOW as f64)
}

pub fn difficulty(hhf: f64, top_average: f64) -> Option<u32> {
    let percent = 100.0 * hhf / top_average;
    (percent.is_finite() && percent > 0.0).then(|| percent.trunc() as u32)
}

pub fn summarize_group(
    classifier: &str,
    division: &str,
    ranked: &[Value],
    hhfs: Option<&HhfTable>,
) -> GroupSummary {
    let record = ranked.first().map(hit_factor);
    let top_average = top_average(ranked);
    let official_hhf = hhfs.and_then(|table| table.lookup(classifier, division));
    let difficulty = match (official_hhf, top_average) {
        (Some(hhf), Some(avg)) => difficulty(hhf, avg),
        _ => None,
    };

    GroupSummary {
        classifier: classifier.to_string(),
        division: division.to_string(),
        entries: ranked.len(),
        record,
        top_average,
        official_hhf,
        difficulty,
    }
}

/// Summaries for every group, hardest first, then by classifier and division.
pub fn summarize(structure: &ProcessedStructure, hhfs: Option<&HhfTable>) -> Vec<GroupSummary> {
    let mut summaries: Vec<GroupSummary> = structure
        .iter()
        .flat_map(|(classifier, divisions)| {
            divisions
                .iter()
                .map(move |(division, ranked)| summarize_group(classifier, division, ranked, hhfs))
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.difficulty
            .cmp(&a.difficulty)
            .then_with(|| a.classifier.cmp(&b.classifier))
            .then_with(|| a.division.cmp(&b.division))
    });
    summaries
}
