//! k-anonymity enforcement
//!
//! Records are partitioned by their tuple of generalized quasi-identifier
//! values. While any partition holds fewer than `k` records, the first
//! column (in escalation order) that still has a coarser level is escalated
//! by one level and the partitions are recomputed. Once every column sits at
//! its coarsest level, records in the remaining undersized partitions are
//! suppressed.
//!
//! Values are always recomputed from the raw record, never from a previous
//! generalization.

use crate::anonymization::generalizer::Generalizer;
use crate::domain::{FieldValue, Record, Result, ShroudError};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::watch;

/// Result of a k-anonymity check over generalized records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KAnonymityCheck {
    /// The k value achieved (smallest class size, 0 for no records)
    pub k: usize,
    /// Whether the records satisfy the target k (vacuously true when empty)
    pub satisfies_target: bool,
    /// Number of distinct equivalence classes
    pub equivalence_classes: usize,
    /// Size of the smallest equivalence class
    pub smallest_class_size: usize,
}

/// Check which k a set of records achieves over `quasi_columns`
///
/// Values are compared as rendered, so run this on already generalized
/// records. A column missing from a record counts as an empty value.
pub fn check(records: &[Record], quasi_columns: &[String], target_k: usize) -> KAnonymityCheck {
    let mut counts: HashMap<Vec<String>, usize> = HashMap::new();
    for record in records {
        let tuple = quasi_columns
            .iter()
            .map(|column| record.get(column).map(ToString::to_string).unwrap_or_default())
            .collect();
        *counts.entry(tuple).or_insert(0) += 1;
    }
    class_stats(counts.values().copied(), counts.len(), target_k)
}

fn class_stats(
    sizes: impl Iterator<Item = usize>,
    classes: usize,
    target_k: usize,
) -> KAnonymityCheck {
    let smallest = sizes.min().unwrap_or(0);
    KAnonymityCheck {
        k: smallest,
        satisfies_target: classes == 0 || smallest >= target_k,
        equivalence_classes: classes,
        smallest_class_size: smallest,
    }
}

/// Final generalization level of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLevel {
    /// Column name
    pub column: String,
    /// Level in effect for the accepted records
    pub level: usize,
    /// Coarsest available level
    pub max_level: usize,
}

/// Outcome of enforcement
#[derive(Debug, Clone)]
pub struct EnforcementOutcome {
    /// Records emitted, in input order, carrying generalized values
    pub accepted: Vec<Record>,
    /// Records removed, in input order, with their original values
    pub suppressed: Vec<Record>,
    /// Final levels in escalation order
    pub levels: Vec<ColumnLevel>,
    /// Number of single-column escalations performed
    pub rounds: usize,
    /// Check over the accepted records
    pub check: KAnonymityCheck,
}

/// Enforces k-anonymity over quasi-identifier columns
pub struct KAnonymityVerifier<'a> {
    generalizer: &'a Generalizer,
    k: usize,
}

impl<'a> KAnonymityVerifier<'a> {
    /// Create a verifier
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `k` is zero.
    pub fn new(generalizer: &'a Generalizer, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ShroudError::Configuration(
                "k must be at least 1".to_string(),
            ));
        }
        Ok(Self { generalizer, k })
    }

    /// Target k
    pub fn k(&self) -> usize {
        self.k
    }

    /// Generalize and enforce k over `records`
    ///
    /// `quasi_columns` is the escalation order. The shutdown signal, when
    /// given, is checked before every round.
    ///
    /// # Errors
    ///
    /// Fails if a quasi column has no rule, generalization fails, or the
    /// shutdown signal fires.
    pub fn enforce(
        &self,
        records: Vec<Record>,
        quasi_columns: &[String],
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<EnforcementOutcome> {
        let max_levels = quasi_columns
            .iter()
            .map(|column| {
                self.generalizer.max_level(column).ok_or_else(|| {
                    ShroudError::Configuration(format!(
                        "Quasi-identifier column '{column}' has no generalization rule"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut levels = vec![0usize; quasi_columns.len()];
        let mut tuples: Vec<Vec<String>> = vec![Vec::with_capacity(quasi_columns.len()); records.len()];
        for (index, column) in quasi_columns.iter().enumerate() {
            for (record, tuple) in records.iter().zip(tuples.iter_mut()) {
                tuple.push(self.generalizer.generalize(record, column, levels[index])?.to_string());
            }
        }

        let mut rounds = 0;
        let undersized = loop {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                return Err(ShroudError::Cancelled);
            }

            let counts = partition_sizes(&tuples);
            let stats = class_stats(counts.values().copied(), counts.len(), self.k);
            if stats.satisfies_target {
                break None;
            }

            let next = (0..quasi_columns.len()).find(|&i| levels[i] < max_levels[i]);
            let Some(index) = next else {
                break Some(counts);
            };

            levels[index] += 1;
            rounds += 1;
            let column = &quasi_columns[index];
            tracing::debug!(
                column = %column,
                level = levels[index],
                smallest_class = stats.smallest_class_size,
                classes = stats.equivalence_classes,
                "Escalating generalization level"
            );
            for (record, tuple) in records.iter().zip(tuples.iter_mut()) {
                tuple[index] = self.generalizer.generalize(record, column, levels[index])?.to_string();
            }
        };

        let mut accepted = Vec::with_capacity(records.len());
        let mut suppressed = Vec::new();
        for (mut record, tuple) in records.into_iter().zip(tuples.iter()) {
            let keep = match &undersized {
                Some(counts) => counts.get(tuple.as_slice()).copied().unwrap_or(0) >= self.k,
                None => true,
            };
            if keep {
                for (column, value) in quasi_columns.iter().zip(tuple) {
                    record.set(column.clone(), FieldValue::Text(value.clone()));
                }
                accepted.push(record);
            } else {
                suppressed.push(record);
            }
        }

        let check = check(&accepted, quasi_columns, self.k);
        if !check.satisfies_target {
            return Err(ShroudError::Validation(format!(
                "k-anonymity post-condition failed: smallest class {} < k {}",
                check.smallest_class_size, self.k
            )));
        }

        if !suppressed.is_empty() {
            tracing::warn!(
                suppressed = suppressed.len(),
                k = self.k,
                "Suppressed records in undersized equivalence classes"
            );
        }

        let levels = quasi_columns
            .iter()
            .zip(levels.iter().zip(max_levels.iter()))
            .map(|(column, (level, max_level))| ColumnLevel {
                column: column.clone(),
                level: *level,
                max_level: *max_level,
            })
            .collect();

        Ok(EnforcementOutcome {
            accepted,
            suppressed,
            levels,
            rounds,
            check,
        })
    }
}

fn partition_sizes(tuples: &[Vec<String>]) -> HashMap<&[String], usize> {
    let mut counts: HashMap<&[String], usize> = HashMap::new();
    for tuple in tuples {
        *counts.entry(tuple.as_slice()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::generalizer::{GeneralizationLevel, GeneralizationRule};

    fn qi() -> Vec<String> {
        vec!["age".to_string(), "zip".to_string()]
    }

    fn row(index: usize, age: i64, zip: &str) -> Record {
        Record::new(index)
            .with("name", format!("CUST{index:06}"))
            .with("age", age)
            .with("zip", zip)
    }

    fn bins_only_age() -> Generalizer {
        Generalizer::new(vec![
            GeneralizationRule::new(
                "age",
                vec![GeneralizationLevel::Bins {
                    edges: vec![0.0, 18.0, 30.0, 40.0, 50.0, 60.0],
                    labels: None,
                }],
            ),
            GeneralizationRule::new(
                "zip",
                vec![
                    GeneralizationLevel::Prefix {
                        keep: 3,
                        mask: 'X',
                        width: None,
                    },
                    GeneralizationLevel::Prefix {
                        keep: 2,
                        mask: 'X',
                        width: None,
                    },
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_check_counts_classes() {
        let records = vec![
            Record::new(0).with("age", "20-29").with("zip", "902XX"),
            Record::new(1).with("age", "20-29").with("zip", "902XX"),
            Record::new(2).with("age", "30-39").with("zip", "902XX"),
        ];
        let result = check(&records, &qi(), 2);

        assert!(!result.satisfies_target);
        assert_eq!(result.k, 1);
        assert_eq!(result.equivalence_classes, 2);
        assert_eq!(result.smallest_class_size, 1);
    }

    #[test]
    fn test_check_empty_is_vacuous() {
        let result = check(&[], &qi(), 5);
        assert!(result.satisfies_target);
        assert_eq!(result.equivalence_classes, 0);
    }

    #[test]
    fn test_zero_k_rejected() {
        let generalizer = Generalizer::default();
        assert!(matches!(
            KAnonymityVerifier::new(&generalizer, 0),
            Err(ShroudError::Configuration(_))
        ));
    }

    #[test]
    fn test_satisfied_at_level_zero() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 2).unwrap();
        let records = vec![
            row(0, 41, "12345"),
            row(1, 45, "12399"),
            row(2, 22, "54321"),
            row(3, 25, "54300"),
        ];

        let outcome = verifier.enforce(records, &qi(), None).unwrap();

        assert_eq!(outcome.rounds, 0);
        assert!(outcome.suppressed.is_empty());
        assert_eq!(outcome.accepted[0].get("age").unwrap().to_string(), "40-49");
        assert_eq!(outcome.accepted[0].get("zip").unwrap().to_string(), "123XX");
        assert!(outcome.levels.iter().all(|l| l.level == 0));
    }

    #[test]
    fn test_escalates_first_column_in_order() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 2).unwrap();
        let records = vec![row(0, 41, "12345"), row(1, 55, "12399")];

        let outcome = verifier.enforce(records, &qi(), None).unwrap();

        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.levels[0].level, 1);
        assert_eq!(outcome.levels[1].level, 0);
        assert_eq!(outcome.accepted[0].get("age").unwrap().to_string(), "40-59");
        assert!(outcome.suppressed.is_empty());
    }

    #[test]
    fn test_zip_escalated_when_age_is_maxed() {
        let generalizer = bins_only_age();
        let verifier = KAnonymityVerifier::new(&generalizer, 2).unwrap();
        let records = vec![row(0, 72, "12345"), row(1, 75, "12499")];

        let outcome = verifier.enforce(records, &qi(), None).unwrap();

        assert_eq!(outcome.levels[0].level, 0);
        assert_eq!(outcome.levels[1].level, 1);
        assert!(outcome.suppressed.is_empty());
        for record in &outcome.accepted {
            assert_eq!(record.get("age").unwrap().to_string(), "60+");
            assert_eq!(record.get("zip").unwrap().to_string(), "12XXX");
        }
    }

    #[test]
    fn test_zip_escalated_before_suppression() {
        let generalizer = bins_only_age();
        let verifier = KAnonymityVerifier::new(&generalizer, 2).unwrap();
        let records = vec![
            row(0, 31, "12345"),
            row(1, 72, "12345"),
            row(2, 35, "12399"),
        ];

        let outcome = verifier.enforce(records, &qi(), None).unwrap();

        assert_eq!(outcome.levels[1].level, 1, "zip escalated before suppressing");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.suppressed.len(), 1);
        assert_eq!(outcome.suppressed[0].row, 1);
        assert_eq!(outcome.suppressed[0].get("age"), Some(&FieldValue::from(72)));

        let rows: Vec<usize> = outcome.accepted.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 2]);
        assert!(check(&outcome.accepted, &qi(), 2).satisfies_target);
    }

    #[test]
    fn test_suppress_level_merges_everything() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 3).unwrap();
        let records = vec![
            row(0, 12, "11111"),
            row(1, 45, "22222"),
            row(2, 88, "33333"),
        ];

        let outcome = verifier.enforce(records, &qi(), None).unwrap();

        assert!(outcome.suppressed.is_empty());
        assert_eq!(outcome.check.equivalence_classes, 1);
        assert!(outcome.levels.iter().all(|l| l.level == l.max_level));
    }

    #[test]
    fn test_too_few_records_are_all_suppressed() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 5).unwrap();
        let records = vec![row(0, 30, "12345"), row(1, 30, "12345")];

        let outcome = verifier.enforce(records, &qi(), None).unwrap();

        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.suppressed.len(), 2);
    }

    #[test]
    fn test_k_one_is_trivial() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 1).unwrap();
        let outcome = verifier
            .enforce(vec![row(0, 30, "12345")], &qi(), None)
            .unwrap();
        assert_eq!(outcome.rounds, 0);
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn test_column_without_rule_rejected() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 2).unwrap();
        let columns = vec!["income".to_string()];
        assert!(matches!(
            verifier.enforce(vec![row(0, 30, "12345")], &columns, None),
            Err(ShroudError::Configuration(_))
        ));
    }

    #[test]
    fn test_cancelled_between_rounds() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 2).unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let result = verifier.enforce(vec![row(0, 30, "12345")], &qi(), Some(&rx));
        assert!(matches!(result, Err(ShroudError::Cancelled)));
    }

    #[test]
    fn test_non_quasi_columns_untouched() {
        let generalizer = Generalizer::default();
        let verifier = KAnonymityVerifier::new(&generalizer, 1).unwrap();
        let outcome = verifier
            .enforce(vec![row(7, 30, "12345")], &qi(), None)
            .unwrap();
        assert_eq!(
            outcome.accepted[0].get("name"),
            Some(&FieldValue::from("CUST000007"))
        );
    }
}
