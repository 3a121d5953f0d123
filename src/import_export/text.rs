//! Plain-text question parser for bulk authoring.
//!
//! Input is split into blocks on blank lines. Within a block the first
//! non-empty line is the question text and the following lines are
//! classified as option lines (`A)`, `b)`, ...), an answer line
//! (`answer:` / `resposta:`), or an explanation line
//! (`explanation:` / `explicação:`), all case-insensitive.
//!
//! A block yields a question only if it has at least two options and an
//! answer letter resolving to a valid option index. Unparseable blocks are
//! dropped silently; callers surface only the aggregate count.

use tracing::debug;

use crate::models::{Question, QuestionType};

/// Answer-line prefixes, English and Portuguese
const ANSWER_PREFIXES: [&str; 2] = ["answer:", "resposta:"];

/// Explanation-line prefixes, English and Portuguese
const EXPLANATION_PREFIXES: [&str; 2] = ["explanation:", "explicação:"];

/// Parse raw pasted text into questions. Returns only the blocks that
/// resolved; the dropped-block count is visible as `blocks - returned`.
pub fn parse_questions(raw: &str) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut dropped = 0usize;

    for block in split_blocks(raw) {
        match parse_block(&block) {
            Some(question) => questions.push(question),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped = dropped, parsed = questions.len(), "Dropped unparseable text blocks");
    }
    questions
}

/// Split input into blocks separated by blank lines
fn split_blocks(raw: &str) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end().to_string());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// True for lines shaped like `A)` / `b)` followed by option text
fn is_option_line(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), Some(')')) if c.is_ascii_alphabetic()
    )
}

/// Strip a case-insensitive prefix, returning the trimmed remainder.
/// Matches char-by-char; the Portuguese prefixes are not single-byte.
fn strip_prefix_ignore_case<'a>(line: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    for prefix in prefixes {
        let mut line_chars = line.char_indices();
        let mut end = 0;
        let mut matched = true;
        for expected in prefix.chars() {
            match line_chars.next() {
                Some((i, c)) if c.to_lowercase().eq(expected.to_lowercase()) => {
                    end = i + c.len_utf8();
                }
                _ => {
                    matched = false;
                    break;
                }
            }
        }
        if matched {
            return Some(line[end..].trim());
        }
    }
    None
}

fn parse_block(lines: &[String]) -> Option<Question> {
    let (text, rest) = lines.split_first()?;

    let mut options = Vec::new();
    let mut answer_letter: Option<char> = None;
    let mut explanation = String::new();

    for line in rest {
        if is_option_line(line) {
            // The full line, prefix included, is the option text
            options.push(line.clone());
        } else if let Some(answer) = strip_prefix_ignore_case(line, &ANSWER_PREFIXES) {
            answer_letter = answer.chars().find(|c| c.is_ascii_alphabetic());
        } else if let Some(expl) = strip_prefix_ignore_case(line, &EXPLANATION_PREFIXES) {
            explanation = expl.to_string();
        }
        // Anything else in the block is ignored
    }

    if options.len() < 2 {
        return None;
    }

    let letter = answer_letter?;
    let correct = (letter.to_ascii_uppercase() as usize).checked_sub('A' as usize)?;
    if correct >= options.len() {
        return None;
    }

    Some(Question {
        text: text.trim().to_string(),
        question_type: QuestionType::Multiple,
        options,
        correct,
        explanation,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_portuguese_block() {
        let raw = "Capital of Brazil?\nA) SP\nB) RJ\nC) Brasilia\nResposta: C\nExplicação: test";
        let questions = parse_questions(raw);
        assert_eq!(questions.len(), 1);

        let q = &questions[0];
        assert_eq!(q.text, "Capital of Brazil?");
        assert_eq!(q.options, vec!["A) SP", "B) RJ", "C) Brasilia"]);
        assert_eq!(q.correct, 2);
        assert_eq!(q.explanation, "test");
    }

    #[test]
    fn test_parses_english_keywords_case_insensitive() {
        let raw = "Which planet is largest?\na) Mars\nb) Jupiter\nANSWER: b\nExplanation: gas giant";
        let questions = parse_questions(raw);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct, 1);
        assert_eq!(questions[0].explanation, "gas giant");
    }

    #[test]
    fn test_multiple_blocks_split_on_blank_lines() {
        let raw = "First question text?\nA) one\nB) two\nAnswer: A\n\n\nSecond question text?\nA) x\nB) y\nAnswer: B";
        let questions = parse_questions(raw);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct, 0);
        assert_eq!(questions[1].correct, 1);
    }

    #[test]
    fn test_block_without_enough_options_is_dropped() {
        let raw = "Lonely question?\nA) only\nAnswer: A";
        assert!(parse_questions(raw).is_empty());
    }

    #[test]
    fn test_block_without_answer_is_dropped() {
        let raw = "No answer here?\nA) one\nB) two";
        assert!(parse_questions(raw).is_empty());
    }

    #[test]
    fn test_answer_beyond_options_is_dropped() {
        let raw = "Out of range?\nA) one\nB) two\nAnswer: D";
        assert!(parse_questions(raw).is_empty());
    }

    #[test]
    fn test_bad_block_does_not_poison_good_blocks() {
        let raw = "Broken block\nno options at all\n\nGood question text?\nA) one\nB) two\nAnswer: B";
        let questions = parse_questions(raw);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Good question text?");
    }
}
