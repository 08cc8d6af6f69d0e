use crate::models::{
    CleanedEntry, Division, RawRecord, COLUMN_CLASSIFIER, COLUMN_DIVISION, COLUMN_HIT_FACTOR,
    COLUMN_MEMBER_NUMBER,
};
use crate::normalizer::normalize_code;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    HitFactor,
    Division,
    MemberNumber,
    ClassifierCode,
}

/// Row counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub rows_in: usize,
    pub rows_dropped: usize,
    pub rows_retained: usize,
    pub bad_hit_factor: usize,
    pub bad_division: usize,
    pub missing_member_number: usize,
    pub bad_classifier_code: usize,
}

impl CleanStats {
    fn record_reject(&mut self, reason: RejectReason) {
        self.rows_dropped += 1;
        match reason {
            RejectReason::HitFactor => self.bad_hit_factor += 1,
            RejectReason::Division => self.bad_division += 1,
            RejectReason::MemberNumber => self.missing_member_number += 1,
            RejectReason::ClassifierCode => self.bad_classifier_code += 1,
        }
    }
}

pub struct RecordCleaner {
    admit_aliased_divisions: bool,
    stats: CleanStats,
}

impl RecordCleaner {
    pub fn new(admit_aliased_divisions: bool) -> Self {
        Self {
            admit_aliased_divisions,
            stats: CleanStats::default(),
        }
    }

    pub fn stats(&self) -> &CleanStats {
        &self.stats
    }

    pub fn into_stats(self) -> CleanStats {
        self.stats
    }

    /// Validates one row and counts the outcome.
    pub fn clean(&mut self, record: RawRecord) -> Option<CleanedEntry> {
        self.stats.rows_in += 1;
        match self.validate(record) {
            Ok(entry) => {
                self.stats.rows_retained += 1;
                Some(entry)
            }
            Err(reason) => {
                self.stats.record_reject(reason);
                None
            }
        }
    }

    /// Checks run in a fixed order and stop at the first failure.
    fn validate(&self, record: RawRecord) -> Result<CleanedEntry, RejectReason> {
        let hit_factor_text = record.get(COLUMN_HIT_FACTOR).trim().to_string();
        let hit_factor = parse_hit_factor(&hit_factor_text).ok_or_else(|| {
            debug!("rejecting row: hit factor {:?}", hit_factor_text);
            RejectReason::HitFactor
        })?;

        let division = self.resolve_division(record.get(COLUMN_DIVISION)).ok_or_else(|| {
            debug!("rejecting row: division {:?}", record.get(COLUMN_DIVISION));
            RejectReason::Division
        })?;

        let member_number = record.get(COLUMN_MEMBER_NUMBER).trim();
        if member_number.is_empty() {
            debug!("rejecting row: no member number");
            return Err(RejectReason::MemberNumber);
        }
        let member_number = member_number.to_string();

        let raw_code = record.get(COLUMN_CLASSIFIER);
        let stage_classifier_code = normalize_code(raw_code).ok_or_else(|| {
            debug!("rejecting row: classifier code {:?}", raw_code);
            RejectReason::ClassifierCode
        })?;

        Ok(CleanedEntry {
            member_number,
            division,
            stage_classifier_code,
            hit_factor,
            hit_factor_text,
            fields: record.fields,
        })
    }

    /// The emitted division goes through the alias table, but admission is
    /// decided on the original text: an alias such as `LTD` is rejected unless
    /// `admit_aliased_divisions` is set.
    fn resolve_division(&self, text: &str) -> Option<Division> {
        let emitted = Division::from_alias(text).or_else(|| Division::from_canonical(text))?;
        let admitted = Division::from_canonical(text).is_some() || self.admit_aliased_divisions;
        admitted.then_some(emitted)
    }
}

/// Positive, finite, non-zero numbers only.
fn parse_hit_factor(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|hf| hf.is_finite() && *hf > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(member: &str, division: &str, code: &str, hf: &str) -> RawRecord {
        RawRecord {
            fields: vec![
                ("first_name".to_string(), "Pat".to_string()),
                (COLUMN_MEMBER_NUMBER.to_string(), member.to_string()),
                (COLUMN_DIVISION.to_string(), division.to_string()),
                (COLUMN_CLASSIFIER.to_string(), code.to_string()),
                (COLUMN_HIT_FACTOR.to_string(), hf.to_string()),
            ],
        }
    }

    #[test]
    fn test_clean_valid_row() {
        let mut cleaner = RecordCleaner::new(false);
        let entry = cleaner
            .clean(row("A1234", "CARRY OPTICS", "09-08 CRACKERJACK", "5.5"))
            .unwrap();
        assert_eq!(entry.member_number, "A1234");
        assert_eq!(entry.division, Division::CarryOptics);
        assert_eq!(entry.stage_classifier_code, "09-08");
        assert_eq!(entry.hit_factor, 5.5);
        assert_eq!(entry.fields[0], ("first_name".to_string(), "Pat".to_string()));
        assert_eq!(cleaner.stats().rows_retained, 1);
    }

    #[test]
    fn test_rejects_bad_hit_factors() {
        let mut cleaner = RecordCleaner::new(false);
        for hf in ["0", "", "abc", "-1.5", "NaN", "inf"] {
            assert!(cleaner.clean(row("A1", "OPEN", "99-11", hf)).is_none(), "{hf}");
        }
        assert_eq!(cleaner.stats().bad_hit_factor, 6);
        assert_eq!(cleaner.stats().rows_dropped, 6);
    }

    #[test]
    fn test_rejects_unsupported_division() {
        let mut cleaner = RecordCleaner::new(false);
        assert!(cleaner.clean(row("A1", "OPEN ", "99-11", "5")).is_none());
        assert!(cleaner.clean(row("A1", "Open", "99-11", "5")).is_none());
        assert!(cleaner.clean(row("A1", "IDPA", "99-11", "5")).is_none());
        assert_eq!(cleaner.stats().bad_division, 3);
    }

    #[test]
    fn test_alias_division_rejected_by_default() {
        let mut cleaner = RecordCleaner::new(false);
        assert!(cleaner.clean(row("A1", "LTD", "99-11", "5")).is_none());
        assert_eq!(cleaner.stats().bad_division, 1);
    }

    #[test]
    fn test_alias_division_admitted_when_enabled() {
        let mut cleaner = RecordCleaner::new(true);
        let entry = cleaner.clean(row("A1", "LTDTEN", "99-11", "5")).unwrap();
        assert_eq!(entry.division, Division::Limited10);
        assert!(cleaner.clean(row("A1", "IDPA", "99-11", "5")).is_none());
    }

    #[test]
    fn test_rejects_missing_member_number() {
        let mut cleaner = RecordCleaner::new(false);
        assert!(cleaner.clean(row("", "PCC", "99-11", "5")).is_none());
        assert!(cleaner.clean(row("  ", "PCC", "99-11", "5")).is_none());
        assert_eq!(cleaner.stats().missing_member_number, 2);
    }

    #[test]
    fn test_rejects_unusable_code() {
        let mut cleaner = RecordCleaner::new(false);
        assert!(cleaner.clean(row("A1", "PCC", "AB-CD", "5")).is_none());
        assert_eq!(cleaner.stats().bad_classifier_code, 1);
    }

    #[test]
    fn test_first_failing_check_is_counted() {
        let mut cleaner = RecordCleaner::new(false);
        assert!(cleaner.clean(row("", "IDPA", "AB-CD", "0")).is_none());
        let stats = cleaner.into_stats();
        assert_eq!(stats.bad_hit_factor, 1);
        assert_eq!(stats.bad_division, 0);
        assert_eq!(stats.rows_in, 1);
        assert_eq!(stats.rows_dropped, 1);
        assert_eq!(stats.rows_retained, 0);
    }

    #[test]
    fn test_hit_factor_text_is_kept_verbatim() {
        let mut cleaner = RecordCleaner::new(false);
        let entry = cleaner.clean(row("A1", "OPEN", "99-11", " 5.50 ")).unwrap();
        assert_eq!(entry.hit_factor_text, "5.50");
        assert_eq!(entry.hit_factor, 5.5);
    }
}
