//! End-to-end tests for the privacy pipeline
//!
//! A fixed-term detector stands in for the external entity recognizer so the
//! expected spans are known exactly.

use shroud::anonymization::detector::{resolve_overlaps, EntityDetector};
use shroud::anonymization::kanonymity;
use shroud::anonymization::vault::hashing::{digest, salted_hash};
use shroud::anonymization::{EntitySpan, PrivacyEngine};
use shroud::config::{parse_config, ShroudConfig};
use shroud::dataset::read_dataset;
use shroud::domain::{DetectionError, EntityLabel, ShroudError};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

const INPUT: &str = "\
name,email,age,zip,comments,segment
John Smith,john@x.com,45,12345,Contact John Smith at john@x.com,gold
Ann Lee,ann@y.org,41,12399,Ann Lee called,silver
Bo Chan,bo@z.net,47,12301,,gold
Cy Dunn,cy@w.io,22,90210,met Bo Chan,bronze
Di Eve,di@v.io,25,90211,,gold
Ed Fox,ed@u.io,88,55555,,gold
";

/// Detects every literal occurrence of a fixed list of terms
struct TermDetector;

const TERMS: &[(&str, &str)] = &[
    ("John Smith", "PERSON"),
    ("Ann Lee", "PERSON"),
    ("Bo Chan", "PERSON"),
    ("Cy Dunn", "PERSON"),
    ("Di Eve", "PERSON"),
    ("Ed Fox", "PERSON"),
    ("john@x.com", "EMAIL"),
    ("ann@y.org", "EMAIL"),
    ("bo@z.net", "EMAIL"),
    ("cy@w.io", "EMAIL"),
    ("di@v.io", "EMAIL"),
    ("ed@u.io", "EMAIL"),
];

impl EntityDetector for TermDetector {
    fn detect(
        &self,
        text: &str,
        labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError> {
        let mut spans = Vec::new();
        for (term, label) in TERMS {
            let label = EntityLabel::new(label).unwrap();
            if !labels.contains(&label) {
                continue;
            }
            for (start, _) in text.match_indices(term) {
                spans.push(EntitySpan::new(start, start + term.len(), label.clone(), *term));
            }
        }
        Ok(resolve_overlaps(spans))
    }

    fn name(&self) -> &str {
        "terms"
    }
}

/// Always fails
struct UnavailableDetector;

impl EntityDetector for UnavailableDetector {
    fn detect(
        &self,
        _text: &str,
        _labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError> {
        Err(DetectionError::Unavailable("model not loaded".to_string()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Returns a span past the end of the text
struct OutOfBoundsDetector;

impl EntityDetector for OutOfBoundsDetector {
    fn detect(
        &self,
        text: &str,
        _labels: &BTreeSet<EntityLabel>,
    ) -> Result<Vec<EntitySpan>, DetectionError> {
        Ok(vec![EntitySpan::new(
            0,
            text.len() + 5,
            EntityLabel::new("PERSON").unwrap(),
            text,
        )])
    }

    fn name(&self) -> &str {
        "out-of-bounds"
    }
}

const BINS_ONLY_RULES: &str = r#"
[[anonymization.rules]]
column = "age"
levels = [{ transform = "bins", edges = [0, 18, 30, 40, 50, 60] }]

[[anonymization.rules]]
column = "zip"
levels = [{ transform = "prefix", keep = 3 }]
"#;

fn setup(dir: &TempDir, k: usize, extra: &str) -> ShroudConfig {
    let input = dir.path().join("customers.csv");
    std::fs::write(&input, INPUT).unwrap();

    let toml = format!(
        r#"
[dataset]
input_path = "{input}"
output_path = "{output}"

[pseudonymization]
salt = "s1"

[anonymization]
k = {k}
{extra}

[audit]
enabled = true
log_path = "{audit}"
record_details = true
"#,
        input = input.display(),
        output = dir.path().join("out").join("private.csv").display(),
        audit = dir.path().join("audit").join("shroud.log").display(),
    );
    parse_config(&toml).unwrap()
}

fn output_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("out").join("private.csv")
}

fn audit_log(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("audit").join("shroud.log")).unwrap_or_default()
}

async fn run(config: ShroudConfig, detector: Arc<dyn EntityDetector>) -> Result<shroud::anonymization::RunReport, ShroudError> {
    let engine = PrivacyEngine::with_detector(config, detector).unwrap();
    let (_tx, rx) = watch::channel(false);
    engine.run(rx).await
}

fn quasi() -> Vec<String> {
    vec!["age".to_string(), "zip".to_string()]
}

#[tokio::test]
async fn test_suppresses_outlier_when_levels_exhausted() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, 2, BINS_ONLY_RULES);

    let report = run(config, Arc::new(TermDetector)).await.unwrap();

    assert_eq!(report.records_in, 6);
    assert_eq!(report.records_out, 5);
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.rounds, 0);
    assert_eq!(report.smallest_class_size, 2);

    let output = read_dataset(&output_path(&dir), b',').unwrap();
    let ages: Vec<String> = output
        .records()
        .iter()
        .map(|r| r.get("age").unwrap().to_string())
        .collect();
    let zips: Vec<String> = output
        .records()
        .iter()
        .map(|r| r.get("zip").unwrap().to_string())
        .collect();
    assert_eq!(ages, ["40-49", "40-49", "40-49", "18-29", "18-29"]);
    assert_eq!(zips, ["123XX", "123XX", "123XX", "902XX", "902XX"]);
    assert!(kanonymity::check(output.records(), &quasi(), 2).satisfies_target);
}

#[tokio::test]
async fn test_escalates_every_column_before_suppressing() {
    let dir = TempDir::new().unwrap();
    // Default rules end in a suppression level for both columns
    let config = setup(&dir, 2, "");

    let report = run(config, Arc::new(TermDetector)).await.unwrap();

    assert_eq!(report.suppressed, 0);
    assert_eq!(report.records_out, 6);
    assert_eq!(report.rounds, 4);
    assert!(report
        .levels
        .iter()
        .all(|level| level.level == level.max_level));

    let output = read_dataset(&output_path(&dir), b',').unwrap();
    for record in output.records() {
        assert_eq!(record.get("age").unwrap().to_string(), "*");
        assert_eq!(record.get("zip").unwrap().to_string(), "*");
    }
}

#[tokio::test]
async fn test_identifiers_replaced_consistently_across_columns() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, 2, BINS_ONLY_RULES);

    run(config, Arc::new(TermDetector)).await.unwrap();

    let output = read_dataset(&output_path(&dir), b',').unwrap();
    let records = output.records();
    let john = records[0].get("name").unwrap().to_string();
    let ann = records[1].get("name").unwrap().to_string();
    let bo = records[2].get("name").unwrap().to_string();

    for token in [&john, &ann, &bo] {
        assert!(token.starts_with("CUST"));
        assert_eq!(token.len(), 10);
        assert!(token[4..].chars().all(|c| c.is_ascii_digit()));
    }
    assert_ne!(john, ann);

    let john_email = salted_hash("s1", "john@x.com");
    assert_eq!(records[0].get("email").unwrap().to_string(), john_email);
    assert_eq!(
        records[0].get("comments").unwrap().to_string(),
        format!("Contact {john} at {john_email}")
    );
    assert_eq!(
        records[1].get("comments").unwrap().to_string(),
        format!("{ann} called")
    );
    // Bo Chan mentioned in another row maps to Bo Chan's token
    assert_eq!(
        records[3].get("comments").unwrap().to_string(),
        format!("met {bo}")
    );
    // Unconfigured columns pass through
    assert_eq!(records[1].get("segment").unwrap().to_string(), "silver");

    let raw = std::fs::read_to_string(output_path(&dir)).unwrap();
    for (term, _) in TERMS {
        assert!(!raw.contains(term), "output still contains {term}");
    }
}

#[tokio::test]
async fn test_audit_log_records_run_without_plaintext() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, 2, BINS_ONLY_RULES);

    let report = run(config, Arc::new(TermDetector)).await.unwrap();

    let log = audit_log(&dir);
    assert!(log.contains("run_completed"));
    assert!(log.contains("record_detections"));
    assert!(log.contains(&report.run_id.to_string()));
    for (term, _) in TERMS {
        assert!(!log.contains(term), "audit log contains {term}");
        assert!(!log.contains(&digest(term)), "audit log contains unsalted digest of {term}");
        assert!(!log.contains(&digest(&term.to_lowercase())));
    }
    assert!(log.contains(&salted_hash("s1", "john smith")));

    let completed: serde_json::Value = log
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|entry| entry["event"] == "run_completed")
        .unwrap();
    assert_eq!(completed["suppressed"], 1);
    assert_eq!(completed["replacements_by_label"]["EMAIL"], 7);
}

#[tokio::test]
async fn test_seeded_single_worker_runs_are_reproducible() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let extra = format!("{BINS_ONLY_RULES}\n[processing]\nworkers = 1\n");

    for dir in [&first_dir, &second_dir] {
        let mut config = setup(dir, 2, &extra);
        config.pseudonymization.token_seed = Some(42);
        run(config, Arc::new(TermDetector)).await.unwrap();
    }

    assert_eq!(
        std::fs::read_to_string(output_path(&first_dir)).unwrap(),
        std::fs::read_to_string(output_path(&second_dir)).unwrap()
    );
}

#[tokio::test]
async fn test_detector_failure_aborts_without_output() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, 2, BINS_ONLY_RULES);

    let result = run(config, Arc::new(UnavailableDetector)).await;

    assert!(matches!(result, Err(ShroudError::Detection(_))));
    assert!(!output_path(&dir).exists());
    assert!(audit_log(&dir).contains("run_failed"));
}

#[tokio::test]
async fn test_invalid_span_aborts_without_output() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, 2, BINS_ONLY_RULES);

    let result = run(config, Arc::new(OutOfBoundsDetector)).await;

    assert!(matches!(
        result,
        Err(ShroudError::Detection(DetectionError::InvalidSpan { .. }))
    ));
    assert!(!output_path(&dir).exists());
}

#[tokio::test]
async fn test_header_only_input_produces_header_only_output() {
    let dir = TempDir::new().unwrap();
    let mut config = setup(&dir, 3, BINS_ONLY_RULES);
    let input = dir.path().join("empty.csv");
    std::fs::write(&input, "name,age,zip\n").unwrap();
    config.dataset.input_path = input;

    let report = run(config, Arc::new(TermDetector)).await.unwrap();

    assert_eq!(report.records_in, 0);
    assert_eq!(report.records_out, 0);
    assert_eq!(
        std::fs::read_to_string(output_path(&dir)).unwrap(),
        "name,age,zip\n"
    );
}

#[tokio::test]
async fn test_existing_output_untouched_on_failure() {
    let dir = TempDir::new().unwrap();
    let config = setup(&dir, 2, BINS_ONLY_RULES);
    std::fs::create_dir_all(output_path(&dir).parent().unwrap()).unwrap();
    std::fs::write(output_path(&dir), "previous release\n").unwrap();

    let result = run(config, Arc::new(UnavailableDetector)).await;

    assert!(result.is_err());
    assert_eq!(
        std::fs::read_to_string(output_path(&dir)).unwrap(),
        "previous release\n"
    );
    assert!(Path::new(&output_path(&dir)).exists());
}
