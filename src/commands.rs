use crate::assistant::StudyAssistant;
use crate::classifier::QueryClassifier;
use crate::common::CommonParams;
use crate::config::Config;
use crate::domain::analyze_domain;
use crate::log_debug;
use crate::types::{
    ChatMessage, ChatReply, ContinueReply, FinalRefinementPackage, RefinementRound,
    RefinementSuggestion, ReplyBody, UserAnswer,
};
use crate::ui::{self, rgb};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal, Write};

/// Load config and apply the command-line overrides without persisting them
fn load_config(common: &CommonParams) -> Result<Config> {
    let mut config = Config::load()?;
    common.apply_to_config(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn build_assistant(config: &Config) -> Result<StudyAssistant> {
    StudyAssistant::from_config(config).context("Failed to initialize the study assistant")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle the 'classify' command
pub fn handle_classify_command(common: &CommonParams, query: &str) {
    let classification = QueryClassifier::new().classify(query);
    if common.json {
        println!("{}", serde_json::json!({ "query": query, "classification": classification }));
    } else {
        ui::print_row("Query", query, rgb::DIM_WHITE, false);
        ui::print_row("Class", &classification.to_string(), rgb::NEON_CYAN, true);
    }
}

/// Handle the 'profile' command
pub fn handle_profile_command(common: &CommonParams, query: &str) {
    let profile = analyze_domain(query);
    if common.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&profile).unwrap_or_default()
        );
        return;
    }

    ui::print_section_header("PROFILE");
    ui::print_row("Domain", profile.domain.tag(), rgb::NEON_CYAN, true);
    for (label, value) in [
        ("Subject", &profile.subject),
        ("Syllabus", &profile.syllabus),
        ("Focus", &profile.exam_focus),
    ] {
        if let Some(value) = value {
            ui::print_row(label, value, rgb::CORAL, false);
        }
    }
    for missing in &profile.missing_info {
        ui::print_row("Missing", missing, rgb::ELECTRIC_YELLOW, false);
    }
    for suggestion in &profile.suggestions {
        ui::print_row("Hint", suggestion, rgb::DIM_WHITE, false);
    }
}

/// Handle the 'refine' command
pub async fn handle_refine_command(common: &CommonParams, query: &str) -> Result<()> {
    let config = load_config(common)?;
    let assistant = build_assistant(&config)?;

    let spinner = ui::create_spinner("Looking for gaps in your question...");
    let round = assistant.refine(query).await;
    spinner.finish_and_clear();
    let round = round?;

    if common.json {
        return print_json(&round);
    }
    print_round(&round);
    Ok(())
}

/// Handle the 'continue' command
pub async fn handle_continue_command(
    common: &CommonParams,
    query: &str,
    answers: Vec<(String, String)>,
    rounds: u32,
) -> Result<()> {
    let config = load_config(common)?;
    let assistant = build_assistant(&config)?;
    let answers: Vec<UserAnswer> = answers
        .into_iter()
        .map(|(id, answer)| UserAnswer::new(id, answer))
        .collect();
    log_debug!("Continuing '{}' with {} answers after {} rounds", query, answers.len(), rounds);

    let spinner = ui::create_spinner("Refining your request...");
    let reply = assistant.continue_refinement(query, &answers, rounds).await;
    spinner.finish_and_clear();
    let reply = reply?;

    if common.json {
        return print_json(&reply);
    }
    print_continue_reply(&reply);
    Ok(())
}

/// Handle the 'ask' command
///
/// Interactive terminals answer each round of questions on stdin until the
/// dialogue produces a package. Otherwise the first reply is printed as-is.
pub async fn handle_ask_command(common: &CommonParams, query: &str) -> Result<()> {
    let config = load_config(common)?;
    let assistant = build_assistant(&config)?;
    let history: Vec<ChatMessage> = Vec::new();

    let spinner = ui::create_spinner("Thinking...");
    let reply = assistant.handle_message(query, &history).await;
    spinner.finish_and_clear();
    let reply = reply?;

    if common.json {
        print_json(&reply)?;
    } else {
        print_chat_reply(&reply);
    }

    let (Some(session_id), ReplyBody::RefinementNeeded { refinement_data, .. }) =
        (reply.session_id(), &reply.body)
    else {
        return Ok(());
    };
    if !io::stdin().is_terminal() {
        return Ok(());
    }

    let mut questions = refinement_data.suggestions.clone();
    loop {
        let answers = prompt_for_answers(&questions)?;
        let spinner = ui::create_spinner("Refining your request...");
        let reply = assistant.continue_session(session_id, answers).await;
        spinner.finish_and_clear();
        let reply = reply?;

        if common.json {
            print_json(&reply)?;
        } else {
            print_continue_reply(&reply);
        }
        if reply.final_package.is_some() {
            return Ok(());
        }
        questions = reply.suggestions;
    }
}

/// Ask each question on the terminal; requires at least one non-blank answer
fn prompt_for_answers(questions: &[RefinementSuggestion]) -> Result<Vec<UserAnswer>> {
    let stdin = io::stdin();
    loop {
        let mut answers = Vec::new();
        for question in questions {
            print!("{} ", format!("{} ›", question.text).cyan().bold());
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                anyhow::bail!("Input closed before the questions were answered");
            }
            if !line.trim().is_empty() {
                answers.push(UserAnswer::new(&question.question_id, line.trim()));
            }
        }
        if !answers.is_empty() {
            return Ok(answers);
        }
        ui::print_warning("Please answer at least one question.");
    }
}

fn print_chat_reply(reply: &ChatReply) {
    match &reply.body {
        ReplyBody::DirectResponse {
            bot_message,
            source,
            refinement_data,
            ..
        } => {
            if let Some(round) = refinement_data {
                log_debug!("Round 1 judged the query clear: {}", round.reasoning);
            }
            print_answer(bot_message, source);
        }
        ReplyBody::RefinementNeeded {
            refinement_data, ..
        } => print_round(refinement_data),
    }
}

fn print_answer(text: &str, source: &str) {
    println!("{text}");
    let dim = rgb::DIM_SEPARATOR;
    ui::print_message(&format!(
        "{}",
        format!("via {source}").truecolor(dim.0, dim.1, dim.2)
    ));
}

fn print_round(round: &RefinementRound) {
    if !round.needs_refinement {
        ui::print_success("Your question is clear enough to answer as-is.");
        ui::print_row("Reasoning", &round.reasoning, rgb::DIM_WHITE, false);
        return;
    }
    ui::print_info("A few questions will make this more specific:");
    ui::print_newline();
    for suggestion in &round.suggestions {
        println!(
            "  {} {}",
            suggestion.question_id.truecolor(
                rgb::ELECTRIC_PURPLE.0,
                rgb::ELECTRIC_PURPLE.1,
                rgb::ELECTRIC_PURPLE.2
            ),
            suggestion.text
        );
    }
    ui::print_newline();
}

fn print_continue_reply(reply: &ContinueReply) {
    match &reply.final_package {
        Some(package) => print_package(package),
        None => print_round(&RefinementRound {
            needs_refinement: reply.needs_refinement,
            suggestions: reply.suggestions.clone(),
            reasoning: reply.reasoning.clone(),
            original_query: reply.original_query.clone(),
            round: 0,
        }),
    }
}

fn print_package(package: &FinalRefinementPackage) {
    ui::print_newline();
    ui::print_section_header("REFINED REQUEST");
    ui::print_bordered_content(&package.refined_query);
    for requirement in &package.requirements {
        ui::print_row("Requirement", requirement, rgb::NEON_CYAN, false);
    }
    ui::print_row("Tags", &package.tags.join(", "), rgb::CORAL, false);
    ui::print_row(
        "Confidence",
        &format!("{:.2}", package.confidence),
        rgb::SUCCESS_GREEN,
        true,
    );
    ui::print_row(
        "Rounds",
        &package.refinement_rounds.to_string(),
        rgb::DIM_WHITE,
        false,
    );
}

/// Apply config command changes; returns true if anything changed
fn apply_config_changes(
    config: &mut Config,
    common: &CommonParams,
    api_key: Option<String>,
    model: Option<String>,
    fast_model: Option<String>,
    param: Option<Vec<String>>,
) -> Result<bool> {
    let mut changes_made = common.apply_to_config(config)?;

    let (provider, _) = config.active_provider_config()?;
    let before = config.get_provider_config(provider.name()).cloned();
    let additional_params = param.map(|params| parse_additional_params(&params));
    config.update_provider(None, api_key, model, additional_params)?;

    if let Some(fast_model) = fast_model
        && let Some(provider_config) = config.providers.get_mut(provider.name())
        && provider_config.fast_model.as_deref() != Some(fast_model.as_str())
    {
        provider_config.fast_model = Some(fast_model);
    }

    changes_made |= before.as_ref() != config.get_provider_config(provider.name());
    Ok(changes_made)
}

/// Handle the 'config' command
pub fn handle_config_command(
    common: &CommonParams,
    api_key: Option<String>,
    model: Option<String>,
    fast_model: Option<String>,
    param: Option<Vec<String>>,
) -> Result<()> {
    let mut config = Config::load()?;

    let changes_made =
        apply_config_changes(&mut config, common, api_key, model, fast_model, param)?;
    if changes_made {
        config.validate()?;
        config.save()?;
        ui::print_success("Configuration updated successfully.");
        ui::print_newline();
    }

    if common.json {
        return print_json(&config.redacted());
    }
    print_configuration(&config);
    Ok(())
}

fn print_configuration(config: &Config) {
    let purple = rgb::ELECTRIC_PURPLE;
    let cyan = rgb::NEON_CYAN;
    let coral = rgb::CORAL;
    let yellow = rgb::ELECTRIC_YELLOW;
    let dim_sep = rgb::DIM_SEPARATOR;

    println!();
    println!(
        "{}  {}  {}",
        "━━━".truecolor(purple.0, purple.1, purple.2),
        "MAHAGURU CONFIGURATION".truecolor(cyan.0, cyan.1, cyan.2).bold(),
        "━━━".truecolor(purple.0, purple.1, purple.2)
    );
    println!();

    ui::print_section_header("GLOBAL");
    ui::print_row("Provider", &config.default_provider, cyan, true);
    ui::print_row(
        "Dev mode",
        if config.runtime.dev_mode { "on" } else { "off" },
        yellow,
        false,
    );
    ui::print_row(
        "Timeout",
        &format!("{}s", config.runtime.timeout_seconds),
        coral,
        false,
    );

    println!();
    ui::print_section_header("REFINEMENT");
    ui::print_row("Max rounds", &config.refinement.max_rounds.to_string(), coral, false);
    ui::print_row(
        "Questions",
        &config.refinement.max_suggestions.to_string(),
        coral,
        false,
    );

    let mut providers: Vec<_> = config
        .providers
        .iter()
        .filter(|(_, cfg)| cfg.has_api_key())
        .collect();
    providers.sort_by_key(|(name, _)| name.as_str());

    for (provider_name, provider_config) in providers {
        println!();
        let header = if provider_name == &config.default_provider {
            format!("{} ✦", provider_name.to_uppercase())
        } else {
            provider_name.to_uppercase()
        };
        ui::print_section_header(&header);
        ui::print_row("Model", &provider_config.model, cyan, true);
        let fast_model = provider_config.fast_model.as_deref().unwrap_or("(default)");
        ui::print_row("Fast Model", fast_model, cyan, false);
        for (key, value) in &provider_config.additional_params {
            ui::print_row(key, value, rgb::DIM_WHITE, false);
        }
    }

    println!();
    println!(
        "{}",
        "─".repeat(40).truecolor(dim_sep.0, dim_sep.1, dim_sep.2)
    );
    println!();
}

/// Parse additional parameters from the command line
fn parse_additional_params(params: &[String]) -> HashMap<String, String> {
    params
        .iter()
        .filter_map(|param| {
            param
                .split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_params_are_skipped() {
        let params = parse_additional_params(&[
            "temperature=0.2".to_string(),
            "broken".to_string(),
        ]);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("temperature").map(String::as_str), Some("0.2"));
    }

    #[test]
    fn config_changes_detect_model_update() {
        let mut config = Config::default();
        let common = CommonParams::default();
        let changed = apply_config_changes(
            &mut config,
            &common,
            None,
            Some("gemini-2.5-pro".to_string()),
            None,
            None,
        )
        .expect("valid change");
        assert!(changed);
        let unchanged = apply_config_changes(
            &mut config,
            &common,
            None,
            Some("gemini-2.5-pro".to_string()),
            None,
            None,
        )
        .expect("valid change");
        assert!(!unchanged);
    }
}
