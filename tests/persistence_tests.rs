//! Saving, resuming, comparing and rendering results.

mod common;

use chrono::Utc;

use career_compass::models::PromptKind;
use career_compass::report::{format_comparison, format_result, OutputFormat};
use career_compass::session::{Answer, SessionId};
use career_compass::store::{
    compare_results, list_results, load_result, save_result, FileSessionStore, SessionSnapshot,
    SessionStore,
};

use common::{builtin_engine, varied_answer, walk};

const CHECKUP: &str = "skill-checkup-statistics";

fn checkup_with(rating: u32) -> career_compass::result::AssessmentResult {
    let engine = builtin_engine();
    let catalog = engine.library().get(CHECKUP).unwrap();
    // The first three prompts get `rating`, the rest a fixed middle value.
    let session = walk(catalog, |prompt, step| match &prompt.kind {
        PromptKind::Scale(_) if step < 3 => Some(Answer::Scale(rating)),
        PromptKind::Scale(_) => Some(Answer::Scale(3)),
        _ => varied_answer(prompt, step),
    });
    engine.finish(&session).unwrap()
}

#[test]
fn saved_results_load_back_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let result = checkup_with(4);

    let path = save_result(&result, dir.path(), None).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with(CHECKUP));
    assert!(name.ends_with(".json"));

    let saved = load_result(&path).unwrap();
    assert_eq!(saved.result, result);
    assert!(saved.saved_at <= Utc::now());
    assert_eq!(list_results(dir.path()).unwrap(), vec![path]);
}

#[test]
fn retaken_checkup_shows_improvement() {
    let before = checkup_with(1);
    let after = checkup_with(5);

    let comparison = compare_results(&before, &after);
    assert_eq!(comparison.catalog_id, CHECKUP);
    assert!(!comparison.improvements.is_empty());
    assert!(comparison.regressions.is_empty());
    assert!(comparison.deltas.iter().all(|d| d.delta >= 0.0));

    let unchanged = compare_results(&after, &after);
    assert!(unchanged.improvements.is_empty() && unchanged.regressions.is_empty());
    assert!(!unchanged.recommendation_changed);

    for format in [
        OutputFormat::Pretty,
        OutputFormat::Json,
        OutputFormat::Markdown,
        OutputFormat::Compact,
    ] {
        assert!(!format_comparison(&comparison, format).is_empty());
    }
}

#[test]
fn interrupted_session_resumes_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let engine = builtin_engine();
    let id = "career-survey-general";

    let full = walk(engine.library().get(id).unwrap(), varied_answer);
    let partial = engine
        .resume(id, SessionId::new("first"), &full.records()[..4])
        .unwrap();
    store
        .save(&SessionSnapshot::capture(&partial, Utc::now()))
        .unwrap();

    let snapshot = store.load(id).unwrap();
    let mut resumed = engine
        .resume(id, snapshot.session_id, &snapshot.answers)
        .unwrap();
    for record in &full.records()[4..] {
        match &record.answer {
            Some(answer) => resumed.answer_and_advance(answer.clone()).unwrap(),
            None => resumed.skip().unwrap(),
        };
    }

    assert_eq!(engine.finish(&resumed).unwrap(), engine.finish(&full).unwrap());
    store.delete(id).unwrap();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn every_format_renders_builtin_results() {
    let result = checkup_with(2);
    let pretty = format_result(&result, OutputFormat::Pretty, true);
    assert!(pretty.contains(&result.recommended.label));

    let json = format_result(&result, OutputFormat::Json, false);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["catalog_id"], CHECKUP);
    assert_eq!(
        value["normalization"]["mode"],
        serde_json::Value::String("weighted_average".into())
    );

    let compact = format_result(&result, OutputFormat::Compact, false);
    assert_eq!(compact.lines().count(), result.ranked_dimensions.len() + 1);

    let markdown = format_result(&result, OutputFormat::Markdown, false);
    assert!(markdown.starts_with("# Assessment Report"));
}
