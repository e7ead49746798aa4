//! Shared test fixtures: small catalogs and answer helpers.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::catalog::{compile, parse_catalog_file};
use crate::input::{InputError, Prompter, Reply};
use crate::models::{Catalog, ChoiceId, Prompt, PromptId};
use crate::session::{Answer, AnswerRecord};

/// Compile a catalog from JSON, panicking on any error.
pub fn catalog_from_json(json: &str) -> Arc<Catalog> {
    let file = parse_catalog_file(json).expect("fixture parses");
    Arc::new(compile(file).expect("fixture compiles"))
}

/// Three dimensions, two prompts: `A+2`, then `B+3, C+1`.
pub fn scenario_one_json() -> String {
    r#"{
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
    }"#
    .to_string()
}

pub fn scenario_one_catalog() -> Arc<Catalog> {
    catalog_from_json(&scenario_one_json())
}

/// One dimension `X` rated twice on a 1-5 scale with weights 1.0 and 1.2.
pub fn weighted_catalog() -> Arc<Catalog> {
    catalog_from_json(
        r#"{
            "id": "weighted",
            "title": "Weighted",
            "scoring": {"mode": "weighted_average", "max_answer_value": 5},
            "primary_source": "fit",
            "dimensions": [{"id": "X", "label": "Skill X",
                            "resources": ["Practise X daily"]}],
            "prompts": [
                {"id": "q1", "text": "Rate X", "kind": "scale", "min": 1, "max": 5,
                 "source": "fit", "weights": {"X": 1.0}},
                {"id": "q2", "text": "Rate X again", "kind": "scale", "min": 1, "max": 5,
                 "source": "fit", "weights": {"X": 1.2}}
            ]
        }"#,
    )
}

/// Seven dimensions, one 1-10 scale prompt each, classified with `k = 2`.
pub fn seven_dimension_catalog() -> Arc<Catalog> {
    let dimensions: Vec<String> = (1..=7)
        .map(|i| {
            format!(
                r#"{{"id": "D{i}", "label": "Dim {i}", "resources": ["Study D{i}", "Practise D{i}"]}}"#
            )
        })
        .collect();
    let prompts: Vec<String> = (1..=7)
        .map(|i| {
            format!(
                r#"{{"id": "q{i}", "text": "Rate D{i}", "kind": "scale", "min": 1, "max": 10,
                    "category": "cat{i}", "weights": {{"D{i}": 1.0}}}}"#
            )
        })
        .collect();
    catalog_from_json(&format!(
        r#"{{
            "id": "seven",
            "title": "Seven",
            "scoring": {{"mode": "weighted_average", "max_answer_value": 10}},
            "classification_k": 2,
            "dimensions": [{}],
            "prompts": [{}]
        }}"#,
        dimensions.join(","),
        prompts.join(",")
    ))
}

/// Scale with a neutral-answer jump over an optional "why" prompt, then an
/// option that can end the session early.
pub fn jump_catalog() -> Arc<Catalog> {
    catalog_from_json(
        r#"{
            "id": "jumps",
            "title": "Jumps",
            "scoring": {"mode": "share_of_maximum"},
            "dimensions": [{"id": "A", "label": "Alpha"}, {"id": "B", "label": "Beta"}],
            "prompts": [
                {"id": "p1", "text": "How much do you like A?", "kind": "scale",
                 "min": 1, "max": 5, "weights": {"A": 1},
                 "jumps": [{"value": 3, "target": {"next_prompt": "p3"}}]},
                {"id": "p2", "text": "Why?", "kind": "free_text", "optional": true},
                {"id": "p3", "text": "Keep going?", "kind": "single_choice",
                 "options": [
                    {"id": "done", "label": "Done", "weights": {"A": 1}, "on_select": "complete"},
                    {"id": "more", "label": "More", "weights": {"B": 1}}
                 ]},
                {"id": "p4", "text": "How much do you like B?", "kind": "scale",
                 "min": 1, "max": 5, "weights": {"B": 1}}
            ]
        }"#,
    )
}

/// Preference prompts and fit prompts over the same three dimensions.
pub fn dual_source_catalog() -> Arc<Catalog> {
    catalog_from_json(
        r#"{
            "id": "dual",
            "title": "Dual",
            "scoring": {"mode": "share_of_maximum"},
            "primary_source": "fit",
            "dimensions": [
                {"id": "DEV", "label": "Development"},
                {"id": "DATA", "label": "Data"},
                {"id": "DESIGN", "label": "Design"}
            ],
            "prompts": [
                {"id": "like", "text": "What do you enjoy?", "kind": "single_choice",
                 "category": "interests",
                 "options": [
                    {"id": "code", "label": "Code", "weights": {"DEV": 2}},
                    {"id": "draw", "label": "Draw", "weights": {"DESIGN": 2}}
                 ]},
                {"id": "hobby", "text": "Pick hobbies", "kind": "multi_choice", "optional": true,
                 "category": "hobbies",
                 "options": [
                    {"id": "puzzles", "label": "Puzzles", "weights": {"DATA": 1}},
                    {"id": "games", "label": "Games", "weights": {"DEV": 1}}
                 ]},
                {"id": "did", "text": "What have you done?", "kind": "single_choice",
                 "source": "fit", "category": "experience",
                 "options": [
                    {"id": "analysis", "label": "Analysis", "weights": {"DATA": 3}},
                    {"id": "app", "label": "App", "weights": {"DEV": 3}}
                 ]},
                {"id": "rate", "text": "Rate your SQL", "kind": "scale", "min": 1, "max": 5,
                 "source": "fit", "category": "self rating", "weights": {"DATA": 1}}
            ]
        }"#,
    )
}

pub fn choice(id: &str) -> Answer {
    Answer::Choice(ChoiceId::from(id))
}

/// Build an answer log from `(prompt id, answer)` pairs.
pub fn records(answers: &[(&str, Answer)]) -> Vec<AnswerRecord> {
    answers
        .iter()
        .map(|(prompt, answer)| AnswerRecord {
            prompt_id: PromptId::from(*prompt),
            answer: Some(answer.clone()),
        })
        .collect()
}

/// Replays canned replies and records rejections; runs dry as end of input.
pub struct ScriptedPrompter {
    replies: VecDeque<Reply>,
    pub asked: Vec<PromptId>,
    pub rejections: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            asked: Vec::new(),
            rejections: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &Prompt, _position: usize, _total: usize) -> Result<Reply, InputError> {
        self.asked.push(prompt.id.clone());
        self.replies.pop_front().ok_or(InputError::EndOfInput)
    }

    fn reject(&mut self, message: &str) -> Result<(), InputError> {
        self.rejections.push(message.to_string());
        Ok(())
    }
}
