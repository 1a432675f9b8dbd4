//! System prompt templates for the dialogue agents and the rubric judge.
//!
//! Each template is a unit struct with a `build` function, so the exact text
//! sent to a model can be asserted on in tests.

use crate::scenario::{Rubric, Scenario};
use crate::transcript::Transcript;

pub const THOUGHTS_OPEN: &str = "[THOUGHTS]";
pub const THOUGHTS_CLOSE: &str = "[/THOUGHTS]";
pub const ACTION_MARKER: &str = "[ACTION]";

/// System instruction that accompanies every judge request.
pub const JUDGE_SYSTEM_PROMPT: &str = "You are an automated evaluator. Always output valid JSON.";

/// NPC system prompt built from the profile, style rules and hard constraints
///
/// # Example
/// ```
/// use harness::agents::prompts::NpcPrompt;
/// use harness::scenario::Scenario;
///
/// let loaded = Scenario::from_yaml_str(
///     "scenario_id: tavern\nnpc_profile:\n  name: Mira\n  archetype: weary innkeeper\n",
/// ).unwrap();
/// let prompt = NpcPrompt::build(&loaded.scenario);
/// assert!(prompt.starts_with("You are Mira, a weary innkeeper"));
/// ```
pub struct NpcPrompt;

impl NpcPrompt {
    pub fn build(scenario: &Scenario) -> String {
        let profile = &scenario.npc_profile;
        if let Some(prompt) = &profile.system_prompt {
            return prompt.clone();
        }

        let mut prompt = if profile.archetype.trim().is_empty() {
            format!("You are {}, a character in a role-playing game.\n", profile.name)
        } else {
            format!(
                "You are {}, a {} in a role-playing game.\n",
                profile.name, profile.archetype
            )
        };
        prompt.push_str("Stay in character at all times and speak directly to the player.\n");

        let rules = &profile.style_rules;
        if !rules.must_have.is_empty() {
            prompt.push_str("\nYour replies should include:\n");
            for rule in &rules.must_have {
                prompt.push_str(&format!("- {}\n", rule));
            }
        }
        if !rules.must_not.is_empty() {
            prompt.push_str("\nNever do or say the following:\n");
            for rule in &rules.must_not {
                prompt.push_str(&format!("- {}\n", rule));
            }
        }
        if !scenario.constraints.hard_fail.is_empty() {
            prompt.push_str("\nHard constraints (breaking one ends the conversation badly):\n");
            for rule in &scenario.constraints.hard_fail {
                prompt.push_str(&format!("- {}\n", rule));
            }
        }

        prompt.push_str(&format!(
            "\nKeep each reply under {} characters.",
            scenario.max_response_chars
        ));
        prompt
    }
}

/// Player simulator prompt built from the persona and goal
///
/// The generated text always names the agent a "simulated player" and asks
/// for `[THOUGHTS] ... [/THOUGHTS]` followed by `[ACTION]`.
pub struct PlayerPrompt;

impl PlayerPrompt {
    pub fn build(scenario: &Scenario) -> String {
        let persona = &scenario.player_persona;
        if let Some(prompt) = &persona.system_prompt {
            return prompt.clone();
        }

        let mut prompt = format!(
            "You are a simulated player in a role-playing game, talking to {}.\n",
            scenario.npc_profile.name
        );
        if !persona.tone.trim().is_empty() {
            prompt.push_str(&format!("Your tone is {}.\n", persona.tone));
        }
        if !persona.traits.is_empty() {
            prompt.push_str(&format!("Your traits: {}.\n", persona.traits.join(", ")));
        }
        if !scenario.goal.trim().is_empty() {
            prompt.push_str(&format!("Your goal: {}\n", scenario.goal));
        }

        prompt.push_str(&format!(
            "\nRespond in exactly this format:\n\
             {open} your private reasoning about what to say next {close}\n\
             {action} the single line you say to the character\n\n\
             Only the text after {action} is spoken aloud.",
            open = THOUGHTS_OPEN,
            close = THOUGHTS_CLOSE,
            action = ACTION_MARKER,
        ));
        prompt
    }
}

/// Judge prompt asking for per-dimension scores as JSON
pub struct JudgePrompt;

impl JudgePrompt {
    /// One `- {dim}: Score between {min} and {max}` line per dimension, or a
    /// restatement of an unstructured rubric.
    pub fn rubric_lines(rubric: &Rubric) -> String {
        if let Some(dimensions) = rubric.dimensions() {
            return dimensions
                .iter()
                .map(|(name, range)| {
                    format!("- {}: Score between {} and {}\n", name, range.min, range.max)
                })
                .collect();
        }

        let criteria = match rubric {
            Rubric::Text(text) => text.clone(),
            Rubric::Freeform(value) => value.to_string(),
            Rubric::Dimensions { .. } | Rubric::Ranges(_) => String::new(),
        };
        format!("Evaluate based on the following criteria: {}", criteria)
    }

    pub fn build(transcript: &Transcript, rubric: &Rubric) -> String {
        format!(
            r#"
You are an expert judge of AI NPC performance.
Review the following conversation transcript and evaluate it based on the provided rubric dimensions.

Transcript:
{transcript}

Rubric Dimensions:
{dimensions}

Instructions:
1. For EACH dimension listed above, provide a score within the specified range.
2. Provide specific evidence/reasoning from the transcript for each score.
3. Calculate the total score.
4. Output your evaluation in valid JSON format.

Output Format (JSON):
{{
  "scores": {{
    "dimension_name": <number>,
    ...
  }},
  "reasoning": {{
    "dimension_name": "<text>",
    ...
  }},
  "total_score": <number>,
  "max_possible_score": <number>
}}
"#,
            transcript = transcript.render(),
            dimensions = Self::rubric_lines(rubric),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Speaker;

    fn scenario(yaml: &str) -> Scenario {
        Scenario::from_yaml_str(yaml).unwrap().scenario
    }

    const FULL: &str = r#"
scenario_id: blacksmith
npc_profile:
  name: Brom
  archetype: gruff blacksmith
  style_rules:
    must_have: [mention the forge]
    must_not: [break character]
constraints:
  hard_fail: [reveal being an AI]
player_persona:
  tone: curious
  traits: [polite, persistent]
goal: Obtain a quest.
max_response_chars: 300
"#;

    #[test]
    fn test_npc_prompt_sections() {
        let prompt = NpcPrompt::build(&scenario(FULL));
        assert!(prompt.starts_with("You are Brom, a gruff blacksmith in a role-playing game."));
        assert!(prompt.contains("- mention the forge"));
        assert!(prompt.contains("- break character"));
        assert!(prompt.contains("- reveal being an AI"));
        assert!(prompt.ends_with("under 300 characters."));
    }

    #[test]
    fn test_player_prompt_convention() {
        let prompt = PlayerPrompt::build(&scenario(FULL));
        assert!(prompt.contains("simulated player"));
        assert!(prompt.contains("talking to Brom"));
        assert!(prompt.contains("Your traits: polite, persistent."));
        assert!(prompt.contains("Your goal: Obtain a quest."));
        assert!(prompt.contains(THOUGHTS_OPEN));
        assert!(prompt.contains(ACTION_MARKER));
    }

    #[test]
    fn test_explicit_overrides() {
        let s = scenario(
            "scenario_id: x\nnpc_profile:\n  name: Mira\n  system_prompt: Custom NPC\nplayer_persona:\n  system_prompt: Custom player\n",
        );
        assert_eq!(NpcPrompt::build(&s), "Custom NPC");
        assert_eq!(PlayerPrompt::build(&s), "Custom player");
    }

    #[test]
    fn test_rubric_lines() {
        let rubric: Rubric =
            serde_json::from_str(r#"{"dimensions": {"tone": {"max": 3}, "accuracy": {"min": 1, "max": 10}}}"#)
                .unwrap();
        assert_eq!(
            JudgePrompt::rubric_lines(&rubric),
            "- accuracy: Score between 1 and 10\n- tone: Score between 0 and 3\n"
        );

        let text = Rubric::Text("Stays in character".to_string());
        assert_eq!(
            JudgePrompt::rubric_lines(&text),
            "Evaluate based on the following criteria: Stays in character"
        );
    }

    #[test]
    fn test_judge_prompt_embeds_transcript() {
        let mut transcript = Transcript::new();
        transcript.push(0, Speaker::Player, "Hi");
        transcript.push(0, Speaker::Npc, "Well met.");
        let prompt = JudgePrompt::build(&transcript, &Rubric::Text("be kind".to_string()));

        assert!(prompt.contains("Transcript:\nPlayer: Hi\nNPC: Well met.\n"));
        assert!(prompt.contains("\"total_score\": <number>"));
    }
}
