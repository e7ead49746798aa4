//! End-to-end behaviour of sessions and results through the public API.

mod common;

use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;

use career_compass::models::{ChoiceId, PromptKind, ScoreSource};
use career_compass::scoring::aggregate;
use career_compass::session::{Answer, Progress, Session, SessionHandle, SessionId};
use career_compass::EngineError;

use common::{
    builtin_engine, catalog, choice, engine_with, records, varied_answer, walk, BUILTIN_IDS,
    MULTIPLIERS, SCENARIO_ONE, SCENARIO_TWO,
};

#[test]
fn share_of_maximum_scenario() {
    let engine = engine_with(vec![catalog(SCENARIO_ONE)]);
    let result = engine
        .evaluate(
            "scenario-one",
            &records(&[("p1", choice("a")), ("p2", choice("bc"))]),
        )
        .unwrap();

    let scores: Vec<(&str, f64, f64)> = result
        .ranked_dimensions
        .iter()
        .map(|e| (e.id.as_str(), e.raw_score, e.normalized_score))
        .collect();
    assert_eq!(
        scores,
        vec![("B", 3.0, 100.0), ("A", 2.0, 66.67), ("C", 1.0, 33.33)]
    );
    assert_eq!(result.recommended.id.as_str(), "B");
    assert_eq!(result.recommended.rank, 1);
    assert_eq!(result.total_prompts, 2);
    assert_eq!(result.answered_prompts, 2);
}

#[test]
fn weighted_average_scenario() {
    let engine = engine_with(vec![catalog(SCENARIO_TWO)]);
    let result = engine
        .evaluate(
            "scenario-two",
            &records(&[("q1", Answer::Scale(4)), ("q2", Answer::Scale(5))]),
        )
        .unwrap();

    assert_eq!(result.primary_source, ScoreSource::Fit);
    assert_eq!(result.recommended.score, 90.91);
    assert_eq!(result.ranked_dimensions[0].raw_score, 10.0);
}

#[test]
fn classification_of_seven_dimensions() {
    let engine = builtin_engine();
    let catalog = engine.library().get("skill-checkup-business").unwrap();
    let session = walk(catalog, varied_answer);
    let result = engine.finish(&session).unwrap();

    assert_eq!(result.ranked_dimensions.len(), 7);
    assert_eq!(result.strengths.len(), 2);
    assert_eq!(result.weaknesses.len(), 2);

    let strengths: BTreeSet<_> = result.strengths.iter().map(|e| &e.id).collect();
    let weaknesses: BTreeSet<_> = result.weaknesses.iter().map(|e| &e.id).collect();
    assert!(strengths.is_disjoint(&weaknesses));

    let unlabeled = result
        .ranked_dimensions
        .iter()
        .filter(|e| !strengths.contains(&e.id) && !weaknesses.contains(&e.id))
        .count();
    assert_eq!(unlabeled, 3);
    assert_eq!(result.strengths[0], result.ranked_dimensions[0]);
    assert_eq!(result.weaknesses[0], result.ranked_dimensions[6]);
}

#[test]
fn answering_a_completed_session_changes_nothing() {
    let mut session = Session::start(SessionId::new("s"), Arc::new(catalog(SCENARIO_ONE))).unwrap();
    session.answer_and_advance(choice("a")).unwrap();
    assert_eq!(session.answer_and_advance(choice("bc")).unwrap(), Progress::Complete);

    let before = session.accumulator().clone();
    let err = session.answer_and_advance(choice("bc")).unwrap_err();
    assert!(matches!(err, EngineError::SessionComplete));
    assert_eq!(session.accumulator(), &before);
    assert_eq!(session.answered_count(), 2);
}

#[test]
fn unknown_option_is_rejected_in_place() {
    let mut session = Session::start(SessionId::new("s"), Arc::new(catalog(SCENARIO_ONE))).unwrap();
    let err = session.answer_and_advance(choice("zz")).unwrap_err();
    assert!(matches!(err, EngineError::InvalidAnswer { .. }));
    assert_eq!(session.cursor(), 0);
    assert!(session.records().is_empty());
}

#[test]
fn results_are_byte_identical_across_runs() {
    for id in BUILTIN_IDS {
        let first = builtin_engine();
        let second = builtin_engine();
        let log = walk(first.library().get(id).unwrap(), varied_answer)
            .records()
            .to_vec();

        let a = serde_json::to_string(&first.evaluate(id, &log).unwrap()).unwrap();
        let b = serde_json::to_string(&second.evaluate(id, &log).unwrap()).unwrap();
        assert_eq!(a, b, "{} is not deterministic", id);
    }
}

#[test]
fn raw_totals_equal_the_selected_weights() {
    let engine = builtin_engine();
    let catalog = engine.library().get("job-simulation-business").unwrap();
    let session = walk(catalog.clone(), varied_answer);

    let mut expected = 0.0;
    for (prompt_id, answer) in session.answers() {
        let prompt = &catalog.prompts[catalog.prompt_index(prompt_id).unwrap()];
        let Answer::Choice(id) = answer else {
            panic!("job simulation only has single choices");
        };
        let choice = prompt.choice(id).unwrap();
        expected += choice
            .weights
            .iter()
            .map(|w| w.value * prompt.multiplier_for(choice))
            .sum::<f64>();
    }

    let card = aggregate(&session).unwrap();
    let total: f64 = card
        .get(ScoreSource::Preference)
        .unwrap()
        .scores
        .iter()
        .map(|s| s.raw)
        .sum();
    assert!((total - expected).abs() < 1e-9);
}

#[test]
fn normalized_scores_stay_in_bounds_and_views_do_not_repeat() {
    let engine = builtin_engine();
    for id in BUILTIN_IDS {
        for offset in 0..4 {
            let catalog = engine.library().get(id).unwrap();
            let session = walk(catalog, |prompt, step| varied_answer(prompt, step + offset));
            let result = engine.finish(&session).unwrap();

            for entry in &result.ranked_dimensions {
                assert!(
                    (0.0..=100.0).contains(&entry.normalized_score),
                    "{}: {} out of range",
                    id,
                    entry.normalized_score
                );
            }
            assert_eq!(result.ranked_dimensions[0].normalized_score, result.recommended.score);

            let mut surfaced: BTreeSet<_> = result.top3_primary.iter().map(|e| &e.id).collect();
            surfaced.insert(&result.recommended.id);
            assert!(result.top3_secondary.iter().all(|e| !surfaced.contains(&e.id)));

            let unique: BTreeSet<_> = result.recommendations.iter().collect();
            assert_eq!(unique.len(), result.recommendations.len());
            assert!(result.recommendations.len() <= 5);
        }
    }
}

#[test]
fn jump_rules_skip_prompts() {
    let engine = builtin_engine();
    let catalog = engine.library().get("career-survey-general").unwrap();

    // A neutral rating on g04 jumps over the optional g05.
    let session = walk(catalog.clone(), |prompt, step| match prompt.id.as_str() {
        "g04" => Some(Answer::Scale(3)),
        _ => varied_answer(prompt, step),
    });
    let visited: Vec<&str> = session.records().iter().map(|r| r.prompt_id.as_str()).collect();
    assert!(visited.contains(&"g04"));
    assert!(!visited.contains(&"g05"));
    assert!(visited.contains(&"g06"));

    // Choosing "none" on g08 ends the session early.
    let session = walk(catalog, |prompt, step| match prompt.id.as_str() {
        "g08" => Some(choice("none")),
        _ => varied_answer(prompt, step),
    });
    assert!(session.is_complete());
    assert_eq!(session.records().last().unwrap().prompt_id.as_str(), "g08");
    let result = engine.finish(&session).unwrap();
    assert!(result.answered_prompts < result.total_prompts);
}

#[test]
fn replaying_a_log_reproduces_the_result() {
    let engine = builtin_engine();
    let catalog = engine.library().get("career-survey-general").unwrap();
    let session = walk(catalog, varied_answer);
    let live = engine.finish(&session).unwrap();

    let replayed = engine
        .evaluate("career-survey-general", session.records())
        .unwrap();
    assert_eq!(live, replayed);

    let resumed = engine
        .resume(
            "career-survey-general",
            SessionId::new("again"),
            &session.records()[..3],
        )
        .unwrap();
    assert!(!resumed.is_complete());
    assert_eq!(resumed.records(), &session.records()[..3]);
}

#[test]
fn dual_sources_rank_independently() {
    let engine = builtin_engine();
    let catalog = engine.library().get("career-survey-general").unwrap();
    let session = walk(catalog, varied_answer);
    let result = engine.finish(&session).unwrap();

    let preference = result.preference_top3.as_ref().unwrap();
    let fit = result.fit_top3.as_ref().unwrap();
    assert_eq!(result.primary_source, ScoreSource::Fit);
    assert_eq!(fit[0].id, result.recommended.id);
    assert!(preference.len() <= 3 && fit.len() <= 3);

    let card = aggregate(&session).unwrap();
    let fit_table = card.get(ScoreSource::Fit).unwrap();
    let best_fit = fit_table
        .scores
        .iter()
        .map(|s| s.normalized)
        .fold(0.0_f64, f64::max);
    assert_eq!(fit[0].normalized_score, best_fit);
}

#[test]
fn concurrent_submissions_merge_once() {
    let session = Session::start(SessionId::new("shared"), Arc::new(catalog(SCENARIO_ONE))).unwrap();
    let handle = SessionHandle::new(session);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let outcomes: Vec<Result<Progress, EngineError>> = (0..threads)
        .map(|_| {
            let handle = handle.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                handle.answer_and_advance(choice("a"))
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect();

    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(outcomes.iter().all(|o| matches!(
        o,
        Ok(_) | Err(EngineError::SubmissionInFlight { .. }) | Err(EngineError::InvalidAnswer { .. })
    )));

    let state = handle.snapshot().unwrap();
    assert_eq!(state.cursor(), 1);
    assert_eq!(state.accumulator().raw(ScoreSource::Preference, 0), 2.0);
}

#[test]
fn free_text_never_moves_scores() {
    let engine = builtin_engine();
    let catalog = engine.library().get("career-survey-general").unwrap();
    let with_text = walk(catalog.clone(), varied_answer);
    let without_text = walk(catalog, |prompt, step| match prompt.kind {
        PromptKind::FreeText => None,
        _ => varied_answer(prompt, step),
    });
    assert_eq!(with_text.accumulator(), without_text.accumulator());
    assert!(with_text.answered_count() > without_text.answered_count());
}

#[test]
fn option_multipliers_override_the_prompt_multiplier() {
    let engine = engine_with(vec![catalog(MULTIPLIERS)]);
    let raw_totals = |p1: &str, p2: &[&str], p3: u32| {
        let picks = p2.iter().map(|id| ChoiceId::from(*id)).collect();
        let result = engine
            .evaluate(
                "multipliers",
                &records(&[
                    ("p1", choice(p1)),
                    ("p2", Answer::Choices(picks)),
                    ("p3", Answer::Scale(p3)),
                ]),
            )
            .unwrap();
        ["A", "B", "C"]
            .iter()
            .map(|id| {
                result
                    .ranked_dimensions
                    .iter()
                    .find(|e| e.id.as_str() == *id)
                    .unwrap()
                    .raw_score
            })
            .collect::<Vec<f64>>()
    };

    // A: 2*1.5 + 1*1.5, B: 2*3.0, C: 4*2*1.5
    assert_eq!(raw_totals("boost", &["x", "y"], 4), vec![4.5, 6.0, 12.0]);
    // A: 2*1.0, C: 1*1.0 + 1*2*1.5
    assert_eq!(raw_totals("plain", &["z"], 1), vec![2.0, 0.0, 4.0]);
    // B: 1*2.0 + 2*3.0, C: 1*1.0 + 2*2*1.5
    assert_eq!(raw_totals("inherit", &["y", "z"], 2), vec![0.0, 8.0, 7.0]);
}

#[test]
fn spec_check_scores_likert_answers_against_the_top_subtype() {
    let engine = builtin_engine();
    let catalog = engine.library().get("spec-check-marketing").unwrap();
    let session = walk(catalog, |prompt, _| match prompt.kind {
        PromptKind::Scale(_) => Some(Answer::Scale(5)),
        _ => None,
    });
    let result = engine.finish(&session).unwrap();

    let scores: Vec<(&str, f64, f64)> = result
        .ranked_dimensions
        .iter()
        .map(|e| (e.id.as_str(), e.raw_score, e.normalized_score))
        .collect();
    assert_eq!(
        scores,
        vec![
            ("performance", 22.5, 100.0),
            ("research", 22.5, 100.0),
            ("brand", 17.5, 77.78),
            ("content", 17.5, 77.78),
            ("crm", 17.5, 77.78),
        ]
    );
    assert_eq!(result.primary_source, ScoreSource::Fit);
    assert_eq!(result.recommended.id.as_str(), "performance");
    assert_eq!(result.answered_prompts, 10);
}
