//! On-disk artifact store.
//!
//! Layout: `<root>/<classifier>/<DIVISION>/all.json` and `top{N}.json`, where
//! the division directory is the division name with whitespace removed.
//! A run writes everything into a sibling staging directory and swaps it in
//! only after every group was written.

use crate::error::{PipelineError, PipelineResult};
use crate::models::{CleanedEntry, Division};
use crate::normalizer::normalize_code;
use crate::ranking::{ClassifierBuckets, RankedGroup};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const ALL_ARTIFACT: &str = "all.json";

/// File name of the top-N artifact, shared by the writer and the read side.
pub fn top_artifact_name(top_n: usize) -> String {
    format!("top{}.json", top_n)
}

/// Entire processed structure: classifier -> division key -> ranked entries.
pub type ProcessedStructure = BTreeMap<String, BTreeMap<String, Vec<Value>>>;

pub struct ArtifactWriter {
    root: PathBuf,
    top_n: usize,
    top_name: String,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>, top_n: usize) -> Self {
        Self {
            root: root.into(),
            top_n,
            top_name: top_artifact_name(top_n),
        }
    }

    /// Writes every group and publishes the result in place of the previous
    /// output. Returns the number of groups written.
    pub async fn publish(&self, buckets: ClassifierBuckets) -> PipelineResult<usize> {
        let staging = self.sibling("staging")?;
        reset_dir(&staging)?;

        info!("writing {} groups to {}", buckets.group_count(), staging.display());
        let written = match self.write_groups(&staging, buckets).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    warn!("could not remove staging directory {}: {}", staging.display(), cleanup);
                }
                return Err(e);
            }
        };

        self.swap_in(&staging)?;
        info!("published {} groups to {}", written, self.root.display());
        Ok(written)
    }

    /// One blocking task per group; each task writes both artifacts of its group.
    async fn write_groups(&self, staging: &Path, buckets: ClassifierBuckets) -> PipelineResult<usize> {
        let mut tasks = JoinSet::new();
        for group in buckets.into_groups() {
            let staging = staging.to_path_buf();
            let top_n = self.top_n;
            let top_name = self.top_name.clone();
            tasks.spawn_blocking(move || write_group(&staging, &group, top_n, &top_name));
        }

        // Drain every task before reporting, so nothing still writes into staging.
        let mut written = 0;
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(PipelineError::from).and_then(|result| result) {
                Ok(()) => written += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    fn swap_in(&self, staging: &Path) -> PipelineResult<()> {
        if let Some(parent) = self.root.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir(parent)?;
        }

        let previous = self.sibling("previous")?;
        let had_previous = self.root.exists();
        if had_previous {
            remove_dir_if_exists(&previous)?;
            fs::rename(&self.root, &previous).map_err(|source| write_error(&self.root, source))?;
        }

        if let Err(source) = fs::rename(staging, &self.root) {
            if had_previous {
                // Put the old output back so readers still see a complete tree.
                if let Err(e) = fs::rename(&previous, &self.root) {
                    warn!(
                        "could not restore previous output to {}, it is left at {}: {}",
                        self.root.display(),
                        previous.display(),
                        e
                    );
                }
            }
            return Err(write_error(&self.root, source));
        }

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&previous) {
                warn!("could not remove previous output {}: {}", previous.display(), e);
            }
        }
        Ok(())
    }

    /// `<parent>/.<name>.<suffix>`, next to the output root so renames stay on one filesystem.
    fn sibling(&self, suffix: &str) -> PipelineResult<PathBuf> {
        let name = self
            .root
            .file_name()
            .ok_or_else(|| PipelineError::InvalidOutputDirectory(self.root.clone()))?;
        Ok(self
            .root
            .with_file_name(format!(".{}.{}", name.to_string_lossy(), suffix)))
    }
}

fn write_group(root: &Path, group: &RankedGroup, top_n: usize, top_name: &str) -> PipelineResult<()> {
    let dir = group_dir(root, &group.code, group.division);
    debug!("{} - {}: {}", group.code, group.division, dir.display());
    create_dir(&dir)?;
    write_json(&dir.join(ALL_ARTIFACT), group.all())?;
    write_json(&dir.join(top_name), group.top(top_n))?;
    Ok(())
}

fn write_json(path: &Path, entries: &[CleanedEntry]) -> PipelineResult<()> {
    let bytes = serde_json::to_vec(entries)?;
    fs::write(path, bytes).map_err(|source| write_error(path, source))
}

fn create_dir(path: &Path) -> PipelineResult<()> {
    fs::create_dir_all(path).map_err(|source| write_error(path, source))
}

fn remove_dir_if_exists(path: &Path) -> PipelineResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(write_error(path, source)),
    }
}

fn reset_dir(path: &Path) -> PipelineResult<()> {
    remove_dir_if_exists(path)?;
    create_dir(path)
}

fn write_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::StorageWrite {
        path: path.to_path_buf(),
        source,
    }
}

fn read_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::StorageRead {
        path: path.to_path_buf(),
        source,
    }
}

fn group_dir(root: &Path, code: &str, division: Division) -> PathBuf {
    root.join(code).join(division.storage_key())
}

/// Read side of the store, used by the serving and summary commands.
pub struct ArtifactStore {
    root: PathBuf,
    top_name: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, top_n: usize) -> Self {
        Self {
            root: root.into(),
            top_name: top_artifact_name(top_n),
        }
    }

    /// Best entry of one group. The classifier goes through the same code
    /// repair as the input, and the division may be given with or without spaces
    /// in any case. Anything that is not a known division finds nothing.
    pub fn best(&self, classifier: &str, division: &str) -> PipelineResult<Option<Value>> {
        let Some(code) = normalize_code(classifier) else {
            return Ok(None);
        };
        let Some(division) = Division::from_storage_key(division) else {
            return Ok(None);
        };
        let path = group_dir(&self.root, &code, division).join(&self.top_name);
        let Some(entries) = read_entries(&path)? else {
            return Ok(None);
        };
        Ok(entries.into_iter().next())
    }

    /// Every group's full ranking.
    pub fn load_all(&self) -> PipelineResult<ProcessedStructure> {
        let mut structure = ProcessedStructure::new();
        for code_dir in sorted_subdirs(&self.root)? {
            let code = dir_name(&code_dir);
            for division_dir in sorted_subdirs(&code_dir)? {
                if let Some(entries) = read_entries(&division_dir.join(ALL_ARTIFACT))? {
                    structure
                        .entry(code.clone())
                        .or_default()
                        .insert(dir_name(&division_dir), entries);
                }
            }
        }
        Ok(structure)
    }

    /// Full ranking of the groups under one classifier.
    pub fn load_classifier(&self, classifier: &str) -> PipelineResult<BTreeMap<String, Vec<Value>>> {
        let mut divisions = BTreeMap::new();
        let Some(code) = normalize_code(classifier) else {
            return Ok(divisions);
        };
        let code_dir = self.root.join(&code);
        if !code_dir.is_dir() {
            return Ok(divisions);
        }
        for division_dir in sorted_subdirs(&code_dir)? {
            if let Some(entries) = read_entries(&division_dir.join(ALL_ARTIFACT))? {
                divisions.insert(dir_name(&division_dir), entries);
            }
        }
        Ok(divisions)
    }
}

fn read_entries(path: &Path) -> PipelineResult<Option<Vec<Value>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(read_error(path, source)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn sorted_subdirs(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|source| read_error(dir, source))? {
        let entry = entry.map_err(|source| read_error(dir, source))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(member: &str, code: &str, division: Division, hf: f64) -> CleanedEntry {
        CleanedEntry {
            member_number: member.to_string(),
            division,
            stage_classifier_code: code.to_string(),
            hit_factor: hf,
            hit_factor_text: hf.to_string(),
            fields: vec![
                ("member_number".to_string(), member.to_string()),
                ("hit_factor".to_string(), hf.to_string()),
            ],
        }
    }

    fn buckets(count: usize) -> ClassifierBuckets {
        let mut entries: Vec<CleanedEntry> = (0..count)
            .map(|i| entry(&format!("m{i}"), "99-11", Division::CarryOptics, i as f64 + 1.0))
            .collect();
        entries.push(entry("p1", "03-09", Division::Pcc, 4.0));
        ClassifierBuckets::build(entries)
    }

    #[tokio::test]
    async fn test_publish_writes_both_artifacts_per_group() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        let written = ArtifactWriter::new(&root, 100).publish(buckets(150)).await.unwrap();
        assert_eq!(written, 2);

        let dir = root.join("99-11").join("CARRYOPTICS");
        let all: Vec<Value> = serde_json::from_slice(&fs::read(dir.join("all.json")).unwrap()).unwrap();
        let top: Vec<Value> = serde_json::from_slice(&fs::read(dir.join("top100.json")).unwrap()).unwrap();
        assert_eq!(all.len(), 150);
        assert_eq!(top.len(), 100);
        assert_eq!(top[..], all[..100]);
        assert_eq!(all[0]["member_number"], "m149");
        assert!(root.join("03-09").join("PCC").join("top100.json").is_file());
        assert!(!temp.path().join(".sorted.staging").exists());
    }

    #[tokio::test]
    async fn test_publish_replaces_previous_output() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        fs::create_dir_all(root.join("stale").join("OPEN")).unwrap();

        ArtifactWriter::new(&root, 100).publish(buckets(3)).await.unwrap();
        assert!(!root.join("stale").exists());
        assert!(root.join("99-11").join("CARRYOPTICS").join("all.json").is_file());
        assert!(!temp.path().join(".sorted.previous").exists());
    }

    #[tokio::test]
    async fn test_republish_is_byte_identical() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        let writer = ArtifactWriter::new(&root, 100);
        let path = root.join("99-11").join("CARRYOPTICS").join("all.json");

        writer.publish(buckets(20)).await.unwrap();
        let first = fs::read(&path).unwrap();
        writer.publish(buckets(20)).await.unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[tokio::test]
    async fn test_store_reads_back_best_and_all() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        ArtifactWriter::new(&root, 100).publish(buckets(5)).await.unwrap();

        let store = ArtifactStore::new(&root, 100);
        let best = store.best("99-11", "CARRY OPTICS").unwrap().unwrap();
        assert_eq!(best["member_number"], "m4");
        assert_eq!(store.best("9911", "carryoptics").unwrap().unwrap(), best);
        assert!(store.best("99-11", "OPEN").unwrap().is_none());
        assert!(store.best("nonsense", "OPEN").unwrap().is_none());
        assert!(store.best("99-11", "/ETC").unwrap().is_none());
        assert!(store.best("99-11", "../x").unwrap().is_none());
        assert!(store.best("99-11", "").unwrap().is_none());

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["99-11"]["CARRYOPTICS"].len(), 5);
        assert_eq!(all["03-09"]["PCC"].len(), 1);

        let classifier = store.load_classifier("03-09").unwrap();
        assert_eq!(classifier.keys().collect::<Vec<_>>(), ["PCC"]);
    }

    #[tokio::test]
    async fn test_store_ignores_division_paths_outside_the_tree() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        ArtifactWriter::new(&root, 100).publish(buckets(2)).await.unwrap();
        // a stray file one level up must not be reachable through the division
        fs::write(root.join("99-11").join("top100.json"), b"[{\"member_number\":\"x\"}]").unwrap();

        let store = ArtifactStore::new(&root, 100);
        assert!(store.best("99-11", ".").unwrap().is_none());
        assert!(store.best("99-11", "..").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_group_write_keeps_previous_output() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("sorted");
        let writer = ArtifactWriter::new(&root, 100);
        writer.publish(buckets(3)).await.unwrap();
        let path = root.join("99-11").join("CARRYOPTICS").join("all.json");
        let before = fs::read(&path).unwrap();

        // a NUL byte can never be part of a directory name
        let broken = ClassifierBuckets::build(vec![
            entry("m1", "99-11", Division::Open, 2.0),
            entry("m2", "99-11\0x", Division::Open, 1.0),
        ]);
        let result = writer.publish(broken).await;
        assert!(matches!(result, Err(PipelineError::StorageWrite { .. })));

        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(!root.join("99-11").join("OPEN").exists());
        assert!(!temp.path().join(".sorted.staging").exists());
        assert!(!temp.path().join(".sorted.previous").exists());
    }

    #[test]
    fn test_write_group_into_a_file_fails() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("plain");
        fs::write(&file, b"").unwrap();
        let group = RankedGroup {
            code: "99-11".to_string(),
            division: Division::Open,
            entries: vec![entry("m1", "99-11", Division::Open, 1.0)],
        };
        assert!(matches!(
            write_group(&file, &group, 100, "top100.json"),
            Err(PipelineError::StorageWrite { .. })
        ));
    }

    #[test]
    fn test_writer_and_store_agree_on_top_artifact_name() {
        assert_eq!(top_artifact_name(10), "top10.json");
        assert_eq!(ArtifactWriter::new("out", 25).top_name, ArtifactStore::new("out", 25).top_name);
    }

    #[test]
    fn test_root_without_name_is_rejected() {
        let writer = ArtifactWriter::new("/", 100);
        assert!(matches!(
            writer.sibling("staging"),
            Err(PipelineError::InvalidOutputDirectory(_))
        ));
    }
}
