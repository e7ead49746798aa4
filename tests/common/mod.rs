//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use career_compass::catalog::{compile, parse_catalog_file, CatalogLibrary};
use career_compass::models::{Catalog, ChoiceId, Prompt, PromptKind};
use career_compass::session::{Answer, AnswerRecord, Session, SessionId};
use career_compass::Engine;

pub const BUILTIN_IDS: &[&str] = &[
    "career-survey-general",
    "job-simulation-business",
    "job-simulation-economics",
    "job-simulation-statistics",
    "skill-checkup-business",
    "skill-checkup-economics",
    "skill-checkup-statistics",
    "spec-check-marketing",
    "spec-check-data",
];

pub fn catalog(json: &str) -> Catalog {
    compile(parse_catalog_file(json).expect("fixture parses")).expect("fixture compiles")
}

pub fn engine_with(catalogs: Vec<Catalog>) -> Engine {
    let mut library = CatalogLibrary::new();
    for catalog in catalogs {
        library.insert(catalog);
    }
    Engine::new(library)
}

pub fn builtin_engine() -> Engine {
    Engine::new(CatalogLibrary::builtin().expect("built-in catalogs load"))
}

pub fn choice(id: &str) -> Answer {
    Answer::Choice(ChoiceId::from(id))
}

/// Answer every prompt the session reaches with `pick`, which receives the
/// prompt and a running counter. `None` skips an optional prompt.
pub fn walk(
    catalog: Arc<Catalog>,
    mut pick: impl FnMut(&Prompt, usize) -> Option<Answer>,
) -> Session {
    let mut session = Session::start(SessionId::new("walk"), catalog).expect("session starts");
    let mut step = 0;
    while let Ok(prompt) = session.current_prompt() {
        let prompt = prompt.clone();
        match pick(&prompt, step) {
            Some(answer) => session.answer_and_advance(answer).expect("answer accepted"),
            None => session.skip().expect("prompt is optional"),
        };
        step += 1;
    }
    session
}

/// A deterministic but varied answer for any prompt kind.
pub fn varied_answer(prompt: &Prompt, step: usize) -> Option<Answer> {
    match &prompt.kind {
        PromptKind::SingleChoice { choices } => {
            // Avoid options that end the session so every prompt is reached.
            let usable: Vec<_> = choices.iter().filter(|c| c.on_select.is_none()).collect();
            let pool = if usable.is_empty() {
                choices.iter().collect()
            } else {
                usable
            };
            Some(Answer::Choice(pool[step % pool.len()].id.clone()))
        }
        PromptKind::MultiChoice { choices } => Some(Answer::Choices(
            choices
                .iter()
                .enumerate()
                .filter(|(i, _)| (i + step) % 2 == 0)
                .map(|(_, c)| c.id.clone())
                .collect(),
        )),
        PromptKind::FreeText => prompt
            .optional
            .then(|| Answer::Text(format!("answer {}", step))),
        PromptKind::Scale(scale) => {
            let span = scale.max - scale.min + 1;
            Some(Answer::Scale(scale.min + ((step as u32 * 3 + 1) % span)))
        }
    }
}

pub fn records(answers: &[(&str, Answer)]) -> Vec<AnswerRecord> {
    answers
        .iter()
        .map(|(prompt, answer)| AnswerRecord {
            prompt_id: (*prompt).into(),
            answer: Some(answer.clone()),
        })
        .collect()
}

pub const SCENARIO_ONE: &str = r#"{
    "id": "scenario-one",
    "title": "Scenario one",
    "scoring": {"mode": "share_of_maximum"},
    "dimensions": [
        {"id": "A", "label": "Alpha"},
        {"id": "B", "label": "Beta"},
        {"id": "C", "label": "Gamma"}
    ],
    "prompts": [
        {"id": "p1", "text": "First", "kind": "single_choice",
         "options": [{"id": "a", "label": "A", "weights": {"A": 2}}]},
        {"id": "p2", "text": "Second", "kind": "single_choice",
         "options": [{"id": "bc", "label": "B and C", "weights": {"B": 3, "C": 1}}]}
    ]
}"#;

pub const SCENARIO_TWO: &str = r#"{
    "id": "scenario-two",
    "title": "Scenario two",
    "scoring": {"mode": "weighted_average", "max_answer_value": 5},
    "primary_source": "fit",
    "dimensions": [{"id": "X", "label": "Skill X"}],
    "prompts": [
        {"id": "q1", "text": "Rate X", "kind": "scale", "min": 1, "max": 5,
         "source": "fit", "weights": {"X": 1.0}},
        {"id": "q2", "text": "Rate X again", "kind": "scale", "min": 1, "max": 5,
         "source": "fit", "weights": {"X": 1.2}}
    ]
}"#;

/// Option multipliers of 1.5 and 1.0 next to options that inherit the
/// prompt multiplier, plus a multiplied scale.
pub const MULTIPLIERS: &str = r#"{
    "id": "multipliers",
    "title": "Multipliers",
    "scoring": {"mode": "share_of_maximum"},
    "dimensions": [
        {"id": "A", "label": "Alpha"},
        {"id": "B", "label": "Beta"},
        {"id": "C", "label": "Gamma"}
    ],
    "prompts": [
        {"id": "p1", "text": "Pick one", "kind": "single_choice", "multiplier": 2.0,
         "options": [
            {"id": "boost", "label": "Boost", "weights": {"A": 2}, "multiplier": 1.5},
            {"id": "plain", "label": "Plain", "weights": {"A": 2}, "multiplier": 1.0},
            {"id": "inherit", "label": "Inherit", "weights": {"B": 1}}
         ]},
        {"id": "p2", "text": "Pick any", "kind": "multi_choice", "multiplier": 3.0,
         "options": [
            {"id": "x", "label": "X", "weights": {"A": 1}, "multiplier": 1.5},
            {"id": "y", "label": "Y", "weights": {"B": 2}},
            {"id": "z", "label": "Z", "weights": {"C": 1}, "multiplier": 1.0}
         ]},
        {"id": "p3", "text": "Rate", "kind": "scale", "min": 1, "max": 5, "multiplier": 1.5,
         "weights": {"C": 2}}
    ]
}"#;
