//! Prompt library for the refinement and answer agents

use schemars::{JsonSchema, schema_for};

use crate::domain::DomainProfile;
use crate::types::{ChatMessage, ConversationTurn, PackagePayload, RoundPayload};

const REFINER_PERSONA: &str = "You are a Query Refinement Assistant for an educational platform.\n\n\
    Your job: analyze student queries and suggest improvements that make them clearer and more specific.";

const CLASSROOM_PERSONA: &str = "You are a good mentor and teacher. \
    You are helping students learn and understand concepts in a classroom setting.";

/// Pretty JSON schema of `T`, embedded so the model knows the exact output shape
fn schema_block<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

fn json_only_footer<T: JsonSchema>() -> String {
    format!(
        "=== OUTPUT FORMAT ===\n\
        Respond with ONLY a JSON object matching this schema:\n\n{}\n\n\
        No explanations, no markdown, no text outside the JSON object.",
        schema_block::<T>()
    )
}

fn format_turns(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("Q: {}\nA: {}\n", turn.question, turn.answer))
        .collect()
}

/// Round-1 prompt: decide whether the query needs clarification
pub fn refinement_prompt(query: &str, profile: &DomainProfile, max_suggestions: usize) -> String {
    format!(
        "{REFINER_PERSONA}\n\n\
        Rules:\n\
        1. Only suggest refinements if the query is vague, too broad, or missing context\n\
        2. Generate at most {max_suggestions} SHORT suggestions (each under 15 words)\n\
        3. Each suggestion should be a YES/NO question or a specific addition\n\
        4. Focus on: skill level, learning goal, format preference, scope, or prerequisites\n\
        5. Keep suggestions practical and educational\n\
        6. If the query is already clear and specific, set needs_refinement to false \
        with an empty suggestions list\n\n\
        Context hints: {hint}\n\n\
        {footer}\n\n\
        Student Query: \"{query}\"\n\n\
        Analyze this query and provide refinement suggestions in JSON format:",
        hint = profile.hint(),
        footer = json_only_footer::<RoundPayload>(),
    )
}

/// Later-round prompt: ask more only if the answers still leave gaps
pub fn continuation_prompt(
    query: &str,
    turns: &[ConversationTurn],
    round: u32,
    max_rounds: u32,
    max_suggestions: usize,
) -> String {
    format!(
        "{REFINER_PERSONA}\n\n\
        The student has answered your clarifying questions.\n\n\
        Original Query: \"{query}\"\n\n\
        Answers so far:\n{answers}\n\
        This is refinement round {round} of at most {max_rounds}. \
        Prefer finishing: only set needs_refinement to true if essential information is still \
        missing, and then ask at most {max_suggestions} new questions that do not repeat \
        anything already answered.\n\n\
        {footer}",
        answers = format_turns(turns),
        footer = json_only_footer::<RoundPayload>(),
    )
}

/// Synthesis prompt: fold every answer into the final refined query
pub fn finalization_prompt(query: &str, turns: &[ConversationTurn], reasoning: &str) -> String {
    let notes = if reasoning.trim().is_empty() {
        String::new()
    } else {
        format!("Notes from the refinement dialogue: {reasoning}\n\n")
    };
    format!(
        "{REFINER_PERSONA}\n\n\
        The refinement dialogue is complete. Produce the final refined request.\n\n\
        Original Query: \"{query}\"\n\n\
        Conversation:\n{answers}\n\
        {notes}\
        Instructions:\n\
        1. Rewrite the original query so it includes everything the student told you\n\
        2. Extract discrete, actionable requirements and constraints\n\
        3. Assign categorization tags (academic or non-academic, subject areas, level)\n\
        4. Report your confidence in the refinement as a number between 0.7 and 1.0\n\n\
        {footer}",
        answers = format_turns(turns),
        footer = json_only_footer::<PackagePayload>(),
    )
}

/// Mentor prompt for the direct-answer path; `history` is already windowed
pub fn direct_answer_prompt(query: &str, history: &[ChatMessage]) -> String {
    let mut prompt = format!("{CLASSROOM_PERSONA}\n\n");
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for message in history {
            prompt.push_str(&format!("{}: {}\n", message.role.label(), message.content));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!("Student: {query}\n\nTeacher:"));
    prompt
}
