//! Integration tests for ledgertag-core
//!
//! These tests exercise the full source → load → recommend workflow against
//! CSV corpora written to temporary directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use ledgertag_core::{
    RecommenderConfig, StrategyKind, Suggestion, TagRecommender, Transaction,
};
use tempfile::TempDir;

/// Two clearly separated tags in the layout of a bank export
fn coffee_rent_csv() -> &'static str {
    r#"Datum;Naam / Omschrijving;Mededelingen;Bedrag (EUR);Tag
2024-01-02;Koffiebar;coffee beans office;12,40;Coffee
2024-01-09;Koffiebar;office coffee beans refill;8,10;Coffee
2024-02-01;Verhuur BV;monthly rent payment;850,00;Rent
2024-03-01;Verhuur BV;monthly rent payment march;850,00;Rent"#
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write corpus");
    path
}

fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(time))
        .expect("Failed to set mtime");
}

fn heuristic_engine(path: &Path) -> TagRecommender {
    heuristic_engine_with(RecommenderConfig::for_source(path))
}

fn heuristic_engine_with(mut config: RecommenderConfig) -> TagRecommender {
    config.classifier.enabled = false;
    TagRecommender::new(config)
}

fn tags(suggestions: &[Suggestion]) -> Vec<&str> {
    suggestions.iter().map(|s| s.tag.as_str()).collect()
}

// =============================================================================
// Recommendation Scenarios
// =============================================================================

#[test]
fn test_heuristic_ranks_matching_tag_first() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let mut engine = heuristic_engine(&path);

    let tx = Transaction::new().with("mededelingen", "office coffee supplies");
    let suggestions = engine.recommend(&tx, 3);

    assert_eq!(tags(&suggestions), vec!["Coffee"]);
    assert!(suggestions[0].score > 0.0);
}

#[test]
fn test_classifier_ranks_matching_tag_first() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let mut engine = TagRecommender::new(RecommenderConfig::for_source(&path));

    let tx = Transaction::new().with("mededelingen", "office coffee supplies");
    let suggestions = engine.recommend(&tx, 3);

    assert_eq!(engine.stats().strategy, Some(StrategyKind::Classifier));
    assert_eq!(suggestions[0].tag, "Coffee");
    assert!(suggestions[0].score > 0.5);
    assert!(suggestions.iter().all(|s| s.score <= 1.0));
    if let Some(rent) = suggestions.iter().find(|s| s.tag == "Rent") {
        assert!(rent.score < suggestions[0].score);
    }
}

#[test]
fn test_empty_transaction_returns_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let mut engine = TagRecommender::new(RecommenderConfig::for_source(&path));

    assert!(engine.recommend(&Transaction::new(), 3).is_empty());

    let blank = Transaction::new()
        .with("mededelingen", "   ")
        .with("unrecognized", "coffee");
    assert!(engine.recommend(&blank, 3).is_empty());
}

#[test]
fn test_out_of_vocabulary_query_returns_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());

    let tx = Transaction::new().with("mededelingen", "zzqxw yybbq");

    let mut classifier = TagRecommender::new(RecommenderConfig::for_source(&path));
    assert!(classifier.recommend(&tx, 3).is_empty());
    assert!(classifier.is_loaded());

    let mut heuristic = heuristic_engine(&path);
    assert!(heuristic.recommend(&tx, 3).is_empty());
}

#[test]
fn test_single_tag_corpus_uses_heuristic() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "training.csv",
        "Tag,Omschrijving\nGeneral,office supplies\nGeneral,printer paper\n",
    );
    let mut engine = TagRecommender::new(RecommenderConfig::for_source(&path));

    let tx = Transaction::new().with("omschrijving", "paper for the office");
    let suggestions = engine.recommend(&tx, 3);

    assert_eq!(tags(&suggestions), vec!["General"]);
    assert!(suggestions[0].score > 0.0);
    let stats = engine.stats();
    assert_eq!(stats.strategy, Some(StrategyKind::Heuristic));
    assert_eq!(stats.classifier_classes, 0);
}

#[test]
fn test_newer_supplementary_source_triggers_reload() {
    let dir = TempDir::new().unwrap();
    let primary = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let supplementary = dir.path().join("tagged.csv");
    let config = RecommenderConfig::for_source(&primary).with_supplementary(&supplementary);
    let mut engine = TagRecommender::new(config);

    // Supplementary source does not exist yet
    let tx = Transaction::new().with("mededelingen", "lunch sandwich");
    assert!(engine.recommend(&tx, 3).is_empty());
    assert_eq!(engine.stats().total_docs, 4);
    let watermark = engine.watermark().unwrap();

    write_file(
        dir.path(),
        "tagged.csv",
        "Tag,Mededelingen\nLunch,lunch sandwich\nLunch,sandwich shop\n",
    );
    set_mtime(&supplementary, watermark + Duration::from_secs(60));

    let suggestions = engine.recommend(&tx, 3);
    assert_eq!(suggestions[0].tag, "Lunch");

    let stats = engine.stats();
    assert_eq!(stats.total_docs, 6);
    assert_eq!(stats.classifier_classes, 3);
    assert!(engine.watermark().unwrap() > watermark);
}

#[test]
fn test_removed_supplementary_source_triggers_reload() {
    let dir = TempDir::new().unwrap();
    let primary = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let supplementary = write_file(
        dir.path(),
        "tagged.csv",
        "Tag,Mededelingen\nLunch,lunch sandwich\nLunch,sandwich shop\n",
    );
    set_mtime(&supplementary, SystemTime::now() - Duration::from_secs(3600));
    let config = RecommenderConfig::for_source(&primary).with_supplementary(&supplementary);
    let mut engine = heuristic_engine_with(config);

    let tx = Transaction::new().with("mededelingen", "lunch sandwich");
    assert_eq!(tags(&engine.recommend(&tx, 3)), vec!["Lunch"]);
    assert_eq!(engine.stats().total_docs, 6);

    // The primary is newer, so removing the supplementary does not move the watermark
    fs::remove_file(&supplementary).unwrap();
    assert!(engine.recommend(&tx, 3).is_empty());
    assert_eq!(engine.stats().total_docs, 4);
}

#[test]
fn test_classifier_miss_falls_back_to_heuristic() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "training.csv",
        "Tag,Mededelingen\nContributie,contributie jeugdleden\nHuur,huur maart\n",
    );
    let mut engine = TagRecommender::new(RecommenderConfig::for_source(&path));

    // "jeugd" is not a classifier feature, but the synonym table links it to the heuristic profile
    let tx = Transaction::new().with("mededelingen", "jeugd");
    let suggestions = engine.recommend(&tx, 3);

    assert_eq!(engine.stats().strategy, Some(StrategyKind::Classifier));
    assert_eq!(tags(&suggestions), vec!["Contributie"]);
    assert!(suggestions[0].score > 0.0);
}

#[test]
fn test_invalid_utf8_row_does_not_drop_source() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("training.csv");
    fs::write(
        &path,
        b"Tag,Memo\nKoffie,koffie kantoor\nHuur,huur maart\nCafe,caf\xE9 bezoek\n",
    )
    .unwrap();
    let mut engine = heuristic_engine(&path);

    assert!(engine.refresh());
    assert_eq!(engine.stats().total_docs, 3);

    let tx = Transaction::new().with("memo", "huur april");
    assert_eq!(tags(&engine.recommend(&tx, 3)), vec!["Huur"]);
}

#[test]
fn test_amount_token_matches_rounded_amount() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "training.csv",
        r#"Mededelingen,Bedrag,Tag
contributie januari,"25,50",Contributie
contributie februari,"25,50",Contributie
koffiebonen,"4,20",Koffie
koffie kantoor,"3,90",Koffie"#,
    );

    let tx = Transaction::new()
        .with("mededelingen", "onbekende afschrijving")
        .with("bedrag", 25.50);

    let mut heuristic = heuristic_engine(&path);
    assert_eq!(tags(&heuristic.recommend(&tx, 3)), vec!["Contributie"]);

    let mut classifier = TagRecommender::new(RecommenderConfig::for_source(&path));
    assert_eq!(classifier.recommend(&tx, 3)[0].tag, "Contributie");
}

// =============================================================================
// Loading and Staleness
// =============================================================================

#[test]
fn test_refresh_is_noop_when_sources_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let mut engine = heuristic_engine(&path);

    assert!(engine.refresh());
    let before = engine.stats();

    let mtime = fs::metadata(&path).unwrap().modified().unwrap();
    fs::write(&path, "Tag,Memo\nOther,other words\n").unwrap();
    set_mtime(&path, mtime);

    assert!(engine.refresh());
    assert_eq!(engine.stats(), before);

    // Explicit reload ignores the watermark
    assert!(engine.reload());
    assert_eq!(engine.stats().total_docs, 1);
}

#[test]
fn test_directory_source_unions_sheets() {
    let dir = TempDir::new().unwrap();
    let sheets = dir.path().join("training");
    fs::create_dir(&sheets).unwrap();
    write_file(&sheets, "bank.csv", coffee_rent_csv());
    write_file(&sheets, "savings.tsv", "Tag\tMemo\nSparen\trente spaarrekening\n");
    write_file(&sheets, "notes.txt", "Tag,Memo\nIgnored,not a sheet\n");
    write_file(&sheets, "untagged.csv", "Datum,Memo\n2024-01-01,no tag column\n");

    let mut engine = heuristic_engine(&sheets);
    assert!(engine.refresh());

    let stats = engine.stats();
    assert_eq!(stats.total_docs, 5);
    let known: Vec<_> = stats.tags.iter().map(|t| t.tag.as_str()).collect();
    assert_eq!(known, vec!["Coffee", "Rent", "Sparen"]);

    let tx = Transaction::new().with("memo", "rente");
    assert_eq!(tags(&engine.recommend(&tx, 3)), vec!["Sparen"]);
}

#[test]
fn test_missing_primary_source_fails_softly() {
    let dir = TempDir::new().unwrap();
    let mut engine = TagRecommender::new(RecommenderConfig::for_source(dir.path().join("nope")));

    assert!(!engine.refresh());
    assert!(!engine.reload());
    let tx = Transaction::new().with("mededelingen", "coffee");
    assert!(engine.recommend(&tx, 3).is_empty());
    assert!(!engine.stats().loaded);
}

// =============================================================================
// Allow-list, Ranking and Fallback
// =============================================================================

#[test]
fn test_allow_list_restricts_output() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let tx = Transaction::new().with("mededelingen", "office coffee rent payment");

    for enabled in [true, false] {
        let mut config = RecommenderConfig::for_source(&path).with_allowed_tags(["Rent"]);
        config.classifier.enabled = enabled;
        let mut engine = TagRecommender::new(config);

        let suggestions = engine.recommend(&tx, 3);
        assert_eq!(tags(&suggestions), vec!["Rent"]);
        assert!(engine.stats().tags.iter().all(|t| t.tag == "Rent"));
    }
}

#[test]
fn test_top_k_truncates_and_ranking_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "training.csv",
        "Tag,Memo\nA,shared alpha\nB,shared beta\nC,shared gamma\nD,shared delta\n",
    );
    let mut engine = heuristic_engine(&path);
    let tx = Transaction::new().with("memo", "shared");

    let first = engine.recommend(&tx, 2);
    assert_eq!(tags(&first), vec!["A", "B"]);
    for _ in 0..5 {
        assert_eq!(engine.recommend(&tx, 2), first);
    }
}

#[test]
fn test_scores_are_rounded() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "training.csv", coffee_rent_csv());
    let mut engine = TagRecommender::new(RecommenderConfig::for_source(&path));

    let tx = Transaction::new().with("mededelingen", "coffee");
    for suggestion in engine.recommend(&tx, 3) {
        let scaled = suggestion.score * 10_000.0;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}

#[test]
fn test_counterparty_fallback() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "training.csv",
        "Tag,Tegenrekening,Mededelingen\nHuur,NL01BANK0123,januari\nHuur,NL01BANK0123,februari\nKoffie,NL02BANK0456,bonen\n",
    );
    let mut engine = heuristic_engine(&path);

    let tx = Transaction::new()
        .with("mededelingen", "maart")
        .with("tegenrekening", "nl99bank0000");
    assert!(engine.recommend(&tx, 3).is_empty());

    assert_eq!(
        engine.suggest_by_counterparty(" nl01bank0123 "),
        Some(Suggestion::new("Huur", 1.0))
    );
}
