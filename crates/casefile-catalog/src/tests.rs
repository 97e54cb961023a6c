//! Catalog loading and answer checking

use super::*;
use proptest::prelude::*;
use tempfile::tempdir;

fn sample_case(id: &str) -> Case {
    Case {
        id: id.to_string(),
        title: "Sample".to_string(),
        difficulty: 2,
        description: "A sample case".to_string(),
        xp_reward: 10,
        category: CategoryId::Beginner,
        brief: "brief".to_string(),
        objectives: vec![],
        solution: Solution {
            answer: "Vincent Malone".to_string(),
            success_message: "well done".to_string(),
            explanation: "because".to_string(),
        },
        schema: vec!["CREATE TABLE t(id INTEGER PRIMARY KEY)".to_string()],
    }
}

#[test]
fn test_builtin_catalog_loads() {
    let catalog = CaseCatalog::builtin().unwrap();
    assert_eq!(catalog.len(), 3);

    let case = catalog.get("case-001").expect("case-001 is built in");
    assert_eq!(case.title, "The Vanishing Briefcase");
    assert_eq!(case.category, CategoryId::Beginner);
    assert!(!case.schema.is_empty());
    assert!(catalog.get("case-404").is_none());
}

#[test]
fn test_check_answer_trims_and_ignores_case() {
    let case = sample_case("c");
    assert!(case.check_answer("Vincent Malone"));
    assert!(case.check_answer("  vincent malone \n"));
    assert!(case.check_answer("VINCENT MALONE"));
    assert!(!case.check_answer("Vincent"));
    assert!(!case.check_answer(""));
}

#[test]
fn test_duplicate_ids_rejected() {
    let err = CaseCatalog::from_cases(vec![sample_case("dup"), sample_case("dup")]).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateCase(id) if id == "dup"));
}

#[test]
fn test_invalid_difficulty_rejected() {
    let mut case = sample_case("hard");
    case.difficulty = 9;
    let err = CaseCatalog::from_cases(vec![case]).unwrap_err();
    assert!(matches!(err, CatalogError::Invalid { .. }));
}

#[test]
fn test_from_dir_reads_json_files_sorted() {
    let dir = tempdir().unwrap();
    for id in ["b-case", "a-case"] {
        let json = serde_json::to_string_pretty(&sample_case(id)).unwrap();
        std::fs::write(dir.path().join(format!("{id}.json")), json).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let catalog = CaseCatalog::from_dir(dir.path()).unwrap();
    assert_eq!(catalog.ids(), vec!["a-case".to_string(), "b-case".to_string()]);
}

#[test]
fn test_from_dir_reports_parse_errors() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let err = CaseCatalog::from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CatalogError::Parse { .. }));
}

#[test]
fn test_category_unlocks() {
    let intermediate = category(CategoryId::Intermediate).unwrap();
    assert!(!intermediate.is_unlocked(99));
    assert!(intermediate.is_unlocked(100));
    assert!(category(CategoryId::Beginner).unwrap().is_unlocked(0));
    assert!(category(CategoryId::Expert).is_none());
}

proptest! {
    #[test]
    fn prop_answer_check_is_case_insensitive(answer in "[A-Za-z ]{1,24}") {
        prop_assume!(!answer.trim().is_empty());
        let mut case = sample_case("p");
        case.solution.answer = answer.clone();
        prop_assert!(case.check_answer(&answer.to_uppercase()));
        let padded = format!("  {}  ", answer.to_lowercase());
        prop_assert!(case.check_answer(&padded));
    }
}
