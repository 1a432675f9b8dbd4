//! Deterministic checks over NPC lines. No model calls.

use super::RuleGrade;
use crate::transcript::Transcript;
use std::collections::BTreeSet;

/// FAIL iff any NPC line is longer than `max_chars` characters.
pub fn check_max_length(transcript: &Transcript, max_chars: usize) -> RuleGrade {
    let failures: BTreeSet<usize> = transcript
        .npc_lines()
        .filter(|line| line.content.chars().count() > max_chars)
        .map(|line| line.turn)
        .collect();

    if failures.is_empty() {
        RuleGrade::pass("All responses within limit.")
    } else {
        let turns: Vec<usize> = failures.into_iter().collect();
        RuleGrade::fail(format!("Failed turns: {:?}", turns))
    }
}

/// PASS iff any keyword appears, case-insensitively, in some NPC line.
pub fn check_keyword_presence(transcript: &Transcript, keywords: &[String]) -> RuleGrade {
    let mut found: BTreeSet<&str> = BTreeSet::new();
    for line in transcript.npc_lines() {
        let text = line.content.to_lowercase();
        for keyword in keywords {
            if !keyword.is_empty() && text.contains(&keyword.to_lowercase()) {
                found.insert(keyword.as_str());
            }
        }
    }

    if found.is_empty() {
        RuleGrade::fail("No keywords found.")
    } else {
        RuleGrade::pass(format!("Found keywords: {:?}", found))
    }
}

/// FAIL iff any NPC line contains, case-insensitively, one of `phrases`.
pub fn check_forbidden_content(transcript: &Transcript, phrases: &[String]) -> RuleGrade {
    let lowered: Vec<(String, &str)> = phrases
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| (p.to_lowercase(), p.as_str()))
        .collect();

    let mut violations = Vec::new();
    for line in transcript.npc_lines() {
        let text = line.content.to_lowercase();
        for (needle, phrase) in &lowered {
            if text.contains(needle.as_str()) {
                violations.push(format!("turn {}: \"{}\"", line.turn, phrase));
            }
        }
    }

    if violations.is_empty() {
        RuleGrade::pass("No forbidden content found.")
    } else {
        RuleGrade::fail(format!("Forbidden content: {}", violations.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graders::Verdict;
    use crate::transcript::Speaker;

    fn transcript(npc_lines: &[&str]) -> Transcript {
        let mut transcript = Transcript::new();
        for (turn, line) in npc_lines.iter().enumerate() {
            transcript.push(turn, Speaker::Player, "x".repeat(1000));
            transcript.push(turn, Speaker::Npc, *line);
        }
        transcript
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_max_length_ignores_player_lines() {
        let grade = check_max_length(&transcript(&["short", "also short"]), 10);
        assert_eq!(grade.result, Verdict::Pass);
        assert_eq!(grade.score, 1);
        assert_eq!(grade.reason, "All responses within limit.");
    }

    #[test]
    fn test_max_length_lists_failing_turns() {
        let t = transcript(&["way too long here", "ok", "another long line"]);
        let grade = check_max_length(&t, 10);
        assert_eq!(grade.result, Verdict::Fail);
        assert_eq!(grade.score, 0);
        assert_eq!(grade.reason, "Failed turns: [0, 2]");
        assert_eq!(check_max_length(&t, 10), grade);
    }

    #[test]
    fn test_max_length_counts_characters() {
        let grade = check_max_length(&transcript(&["ドワーフの鍛冶屋"]), 8);
        assert_eq!(grade.result, Verdict::Pass);
    }

    #[test]
    fn test_max_length_boundary() {
        assert!(check_max_length(&transcript(&["12345"]), 5).result.is_pass());
        assert!(!check_max_length(&transcript(&["123456"]), 5).result.is_pass());
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let t = transcript(&["I have a quest for you.", "Seek the QUEST giver."]);
        let grade = check_keyword_presence(&t, &keywords(&["Quest", "dragon"]));
        assert_eq!(grade.result, Verdict::Pass);
        assert_eq!(grade.reason, "Found keywords: {\"Quest\"}");
    }

    #[test]
    fn test_keyword_none_found() {
        let grade = check_keyword_presence(&transcript(&["Hello."]), &keywords(&["quest"]));
        assert_eq!(grade.result, Verdict::Fail);
        assert_eq!(grade.reason, "No keywords found.");

        let grade = check_keyword_presence(&transcript(&["Hello."]), &[]);
        assert_eq!(grade.score, 0);
    }

    #[test]
    fn test_forbidden_content() {
        let t = transcript(&["Well met.", "As an AI language model, I cannot."]);
        let grade = check_forbidden_content(&t, &keywords(&["as an ai", "Modern slang"]));
        assert_eq!(grade.result, Verdict::Fail);
        assert_eq!(grade.reason, "Forbidden content: turn 1: \"as an ai\"");

        let grade = check_forbidden_content(&t, &keywords(&["", "dragon"]));
        assert_eq!(grade.result, Verdict::Pass);
    }
}
