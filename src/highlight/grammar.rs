//! Grammar: Line-state machine over SBVR sections
//!
//! States and their rule tables:
//! - `start` - comments, `Term:` / `Fact Type:` / `Rule:` labels, whitespace
//! - `term` - one vocabulary term filling the rest of the line
//! - `fact_type` - `[word] TERM filler VERB filler [word] TERM (filler VERB filler [word] TERM)?`
//! - `rule` - handed to the RuleScanner
//!
//! Each rule's named slots carry their own token kind, so patterns can be
//! rearranged without re-aligning capture indices. The grammar is rebuilt
//! whenever the vocabulary changes; rules whose vocabulary is unusable are
//! left out, and text no rule accounts for becomes one `free-text` token.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::highlight::config::HighlightConfig;
use crate::highlight::pattern::PatternSet;
use crate::highlight::rule_scanner::RuleScanner;
use crate::highlight::token::{push_trimmed, push_words, Token, TokenKind};
use crate::highlight::vocabulary::CollectionName;

// =============================================================================
// Line states
// =============================================================================

/// Tokenizer state carried from one line to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    #[default]
    Start,
    Term,
    FactType,
    Rule,
}

impl LineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineState::Start => "start",
            LineState::Term => "term",
            LineState::FactType => "fact_type",
            LineState::Rule => "rule",
        }
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(LineState::Start),
            "term" => Ok(LineState::Term),
            "fact_type" => Ok(LineState::FactType),
            "rule" => Ok(LineState::Rule),
            other => Err(format!("unknown line state '{}'", other)),
        }
    }
}

/// Tokens of one line plus the state for the next line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    pub state: LineState,
}

// =============================================================================
// Rules
// =============================================================================

/// How a named slot is emitted
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Whitespace around the value becomes `text`
    Trimmed(TokenKind),
    /// Every word gets the kind, whitespace becomes `text`
    Words(TokenKind),
}

#[derive(Debug, Clone)]
enum Action {
    Slots(Vec<(&'static str, Slot)>),
    ScanRule,
}

#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    action: Action,
    next: Option<LineState>,
    /// Only tried at column 0
    line_start_only: bool,
}

impl Rule {
    fn new(source: &str, action: Action, next: Option<LineState>) -> Option<Self> {
        match Regex::new(source) {
            Ok(regex) => Some(Self {
                regex,
                action,
                next,
                line_start_only: false,
            }),
            Err(err) => {
                tracing::warn!("grammar rule rejected: {}", err);
                None
            }
        }
    }

    fn at_line_start(mut self) -> Self {
        self.line_start_only = true;
        self
    }
}

// =============================================================================
// Grammar
// =============================================================================

/// The compiled line-state machine for one vocabulary
pub struct Grammar {
    start: Vec<Rule>,
    term: Vec<Rule>,
    fact_type: Vec<Rule>,
    rule: Vec<Rule>,
    scanner: RuleScanner,
}

impl Grammar {
    pub fn build(patterns: &PatternSet, config: &HighlightConfig) -> Self {
        let grammar = Self {
            start: start_rules(config),
            term: term_rules(patterns),
            fact_type: fact_type_rules(patterns),
            rule: Rule::new(r"^.+", Action::ScanRule, Some(LineState::Start))
                .into_iter()
                .collect(),
            scanner: RuleScanner::new(patterns),
        };
        tracing::debug!(
            "grammar rebuilt: term={} fact_type={} rule_categories={}",
            grammar.term.len(),
            grammar.fact_type.len(),
            grammar.scanner.active_categories()
        );
        grammar
    }

    fn rules(&self, state: LineState) -> &[Rule] {
        match state {
            LineState::Start => &self.start,
            LineState::Term => &self.term,
            LineState::FactType => &self.fact_type,
            LineState::Rule => &self.rule,
        }
    }

    /// Tokenize one line starting in `state`.
    ///
    /// Never fails and always consumes the whole line; an empty line yields
    /// no tokens and keeps the state.
    pub fn tokenize_line(&self, state: LineState, line: &str) -> LineTokens {
        let mut tokens = Vec::new();
        let mut state = state;
        let mut cursor = 0;

        while cursor < line.len() {
            let rest = &line[cursor..];
            let matched = self.rules(state).iter().find_map(|rule| {
                if rule.line_start_only && cursor > 0 {
                    return None;
                }
                let caps = rule.regex.captures(rest)?;
                let len = caps.get(0).map_or(0, |m| m.end());
                (len > 0).then_some((rule, caps, len))
            });

            let Some((rule, caps, len)) = matched else {
                tokens.push(Token::new(rest, TokenKind::FreeText));
                state = LineState::Start;
                break;
            };

            match &rule.action {
                Action::Slots(slots) => emit_slots(&caps, slots, &mut tokens),
                Action::ScanRule => self.scanner.scan(&rest[..len], &mut tokens),
            }
            cursor += len;
            if let Some(next) = rule.next {
                state = next;
            }
        }

        LineTokens { tokens, state }
    }

    /// Tokenize a whole document from the `start` state
    pub fn tokenize_document(&self, text: &str) -> Vec<LineTokens> {
        let mut state = LineState::Start;
        split_lines(text)
            .map(|line| {
                let result = self.tokenize_line(state, line);
                state = result.state;
                result
            })
            .collect()
    }
}

/// Split on `\n` the way the editor counts rows: a trailing newline
/// yields a final empty line and `\r\n` endings are stripped.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Emit matched slots in text order; unclaimed gaps become `text`.
fn emit_slots(caps: &Captures<'_>, slots: &[(&'static str, Slot)], tokens: &mut Vec<Token>) {
    let Some(whole) = caps.get(0) else { return };
    let haystack = whole.as_str();

    let mut spans: Vec<(usize, usize, Slot)> = slots
        .iter()
        .filter_map(|(name, slot)| {
            let m = caps.name(name)?;
            (!m.as_str().is_empty()).then_some((m.start(), m.end(), *slot))
        })
        .collect();
    spans.sort_by_key(|(start, _, _)| *start);

    let mut cursor = whole.start();
    for (start, end, slot) in spans {
        if start > cursor {
            tokens.push(Token::text(&haystack[cursor..start]));
        }
        let value = &haystack[start..end];
        match slot {
            Slot::Trimmed(kind) => push_trimmed(tokens, value, kind),
            Slot::Words(kind) => push_words(tokens, value, kind),
        }
        cursor = end;
    }
    if cursor < whole.end() {
        tokens.push(Token::text(&haystack[cursor..whole.end()]));
    }
}

// =============================================================================
// Rule tables
// =============================================================================

fn start_rules(config: &HighlightConfig) -> Vec<Rule> {
    let label = |words: &str| {
        if config.case_insensitive_labels {
            format!(r"^(?P<label>\s*(?i:{})\s?:)(?P<gap>\s+)", words)
        } else {
            format!(r"^(?P<label>\s*{}\s?:)(?P<gap>\s+)", words)
        }
    };
    let label_slots = |kind| Action::Slots(vec![("label", Slot::Trimmed(kind)), ("gap", Slot::Trimmed(TokenKind::Text))]);

    [
        Rule::new(
            r"^(?P<comment>#.*)$",
            Action::Slots(vec![("comment", Slot::Trimmed(TokenKind::Comment))]),
            None,
        ),
        Rule::new(
            &label("Term"),
            label_slots(TokenKind::TermLabel),
            Some(LineState::Term),
        )
        .map(Rule::at_line_start),
        Rule::new(
            &label(r"Fact\s?Type"),
            label_slots(TokenKind::FactTypeLabel),
            Some(LineState::FactType),
        )
        .map(Rule::at_line_start),
        Rule::new(
            &label("Rule"),
            label_slots(TokenKind::RuleLabel),
            Some(LineState::Rule),
        )
        .map(Rule::at_line_start),
        Rule::new(
            r"^(?P<ws>\s+)",
            Action::Slots(vec![("ws", Slot::Trimmed(TokenKind::Text))]),
            None,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn term_rules(patterns: &PatternSet) -> Vec<Rule> {
    let Some(terms) = patterns.get(CollectionName::Terms).source() else {
        return Vec::new();
    };
    Rule::new(
        &format!(r"^(?P<indent>\s*)(?P<term>{})(?P<trail>\s*)$", terms),
        Action::Slots(vec![
            ("indent", Slot::Trimmed(TokenKind::Text)),
            ("term", Slot::Trimmed(TokenKind::Term)),
            ("trail", Slot::Trimmed(TokenKind::Text)),
        ]),
        Some(LineState::Start),
    )
    .into_iter()
    .collect()
}

fn fact_type_rules(patterns: &PatternSet) -> Vec<Rule> {
    let (Some(terms), Some(verbs)) = (
        patterns.get(CollectionName::Terms).source(),
        patterns.get(CollectionName::Verbs).source(),
    ) else {
        return Vec::new();
    };

    // Filler between slots: at least one space, as few words as possible
    let filler = r"\s+(?:\S+\s+)*?";
    let source = format!(
        concat!(
            r"^(?P<indent>\s*)(?:(?P<lead>\S+)(?P<lead_ws>\s+))?(?P<subject>{t})",
            r"(?P<pre_verb>{f})(?P<verb>{v})",
            r"(?P<pre_object>{f})(?:(?P<object_lead>\S+)(?P<object_lead_ws>\s+))?(?P<object>{t})",
            r"(?:(?P<pre_tail_verb>{f})(?P<tail_verb>{v})",
            r"(?P<pre_tail>{f})(?:(?P<tail_lead>\S+)(?P<tail_lead_ws>\s+))?(?P<tail>{t}))?",
            r"(?P<trail>\s+|$)",
        ),
        t = terms,
        v = verbs,
        f = filler,
    );

    let other = Slot::Trimmed(TokenKind::Other);
    let text = Slot::Trimmed(TokenKind::Text);
    let term = Slot::Trimmed(TokenKind::Term);
    let verb = Slot::Trimmed(TokenKind::Verb);
    let words = Slot::Words(TokenKind::Other);

    Rule::new(
        &source,
        Action::Slots(vec![
            ("indent", text),
            ("lead", other),
            ("lead_ws", text),
            ("subject", term),
            ("pre_verb", words),
            ("verb", verb),
            ("pre_object", words),
            ("object_lead", other),
            ("object_lead_ws", text),
            ("object", term),
            ("pre_tail_verb", words),
            ("tail_verb", verb),
            ("pre_tail", words),
            ("tail_lead", other),
            ("tail_lead_ws", text),
            ("tail", term),
            ("trail", text),
        ]),
        Some(LineState::Start),
    )
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::vocabulary::VocabularyStore;

    fn grammar(collections: &[(&str, &[&str])]) -> Grammar {
        let config = HighlightConfig::default();
        let mut store = VocabularyStore::new();
        store.update(
            collections
                .iter()
                .map(|(name, items)| (*name, items.iter().map(|s| s.to_string()).collect())),
        );
        Grammar::build(&PatternSet::build(&store, &config), &config)
    }

    fn kinds(line: &LineTokens) -> Vec<(TokenKind, &str)> {
        line.tokens.iter().map(|t| (t.kind, t.value.as_str())).collect()
    }

    #[test]
    fn test_line_state_names() {
        for state in [LineState::Start, LineState::Term, LineState::FactType, LineState::Rule] {
            assert_eq!(state.as_str().parse::<LineState>(), Ok(state));
        }
        assert!("body".parse::<LineState>().is_err());
    }

    #[test]
    fn test_comment_line() {
        let g = grammar(&[]);
        let line = g.tokenize_line(LineState::Start, "# pharmacy rules");
        assert_eq!(kinds(&line), vec![(TokenKind::Comment, "# pharmacy rules")]);
        assert_eq!(line.state, LineState::Start);
    }

    #[test]
    fn test_indented_comment() {
        let g = grammar(&[]);
        let line = g.tokenize_line(LineState::Start, "  # note");
        assert_eq!(
            kinds(&line),
            vec![(TokenKind::Text, "  "), (TokenKind::Comment, "# note")]
        );
    }

    #[test]
    fn test_term_line() {
        let g = grammar(&[("terms", &["medicine", "medicine delivery report"])]);
        let line = g.tokenize_line(LineState::Start, "Term: medicine delivery report");
        assert_eq!(
            kinds(&line),
            vec![
                (TokenKind::TermLabel, "Term:"),
                (TokenKind::Text, " "),
                (TokenKind::Term, "medicine delivery report"),
            ]
        );
        assert_eq!(line.state, LineState::Start);
    }

    #[test]
    fn test_term_must_fill_line() {
        let g = grammar(&[("terms", &["medicine"])]);
        let line = g.tokenize_line(LineState::Start, "Term: medicine cabinet");
        assert_eq!(line.tokens[2], Token::new("medicine cabinet", TokenKind::FreeText));
        assert_eq!(line.state, LineState::Start);
    }

    #[test]
    fn test_labels_tolerate_case_and_spacing() {
        let g = grammar(&[]);
        for (text, kind, state) in [
            ("  term : x", TokenKind::TermLabel, LineState::Term),
            ("FactType: x", TokenKind::FactTypeLabel, LineState::FactType),
            ("Fact type : x", TokenKind::FactTypeLabel, LineState::FactType),
            ("RULE: x", TokenKind::RuleLabel, LineState::Rule),
        ] {
            let line = g.tokenize_line(LineState::Start, &text[..text.len() - 1]);
            let label = line.tokens.iter().find(|t| t.kind != TokenKind::Text);
            assert_eq!(label.map(|t| t.kind), Some(kind), "{}", text);
            assert_eq!(line.state, state, "{}", text);
        }
    }

    #[test]
    fn test_case_sensitive_labels_when_configured() {
        let config = HighlightConfig {
            case_insensitive_labels: false,
            ..HighlightConfig::default()
        };
        let g = Grammar::build(&PatternSet::build(&VocabularyStore::new(), &config), &config);
        let line = g.tokenize_line(LineState::Start, "rule: x");
        assert_eq!(kinds(&line), vec![(TokenKind::FreeText, "rule: x")]);
    }

    #[test]
    fn test_label_only_at_line_start() {
        let g = grammar(&[]);
        let line = g.tokenize_line(LineState::Start, "see Rule: x");
        assert_eq!(kinds(&line), vec![(TokenKind::FreeText, "see Rule: x")]);
    }

    #[test]
    fn test_label_state_carries_to_next_line() {
        let g = grammar(&[("terms", &["medicine"])]);
        let first = g.tokenize_line(LineState::Start, "Term: ");
        assert_eq!(first.state, LineState::Term);
        let second = g.tokenize_line(first.state, "medicine");
        assert_eq!(kinds(&second), vec![(TokenKind::Term, "medicine")]);
        assert_eq!(second.state, LineState::Start);
    }

    #[test]
    fn test_fact_type_with_tail() {
        let g = grammar(&[
            ("terms", &["pharmacist", "medicine", "medicine delivery report"]),
            ("verbs", &["attaches", "with"]),
        ]);
        let line = g.tokenize_line(
            LineState::Start,
            "Fact Type: pharmacist attaches medicine with medicine delivery report",
        );
        let significant: Vec<_> = kinds(&line)
            .into_iter()
            .filter(|(k, _)| *k != TokenKind::Text)
            .collect();
        assert_eq!(
            significant,
            vec![
                (TokenKind::FactTypeLabel, "Fact Type:"),
                (TokenKind::Term, "pharmacist"),
                (TokenKind::Verb, "attaches"),
                (TokenKind::Term, "medicine"),
                (TokenKind::Verb, "with"),
                (TokenKind::Term, "medicine delivery report"),
            ]
        );
    }

    #[test]
    fn test_fact_type_filler_words_are_other() {
        let g = grammar(&[("terms", &["car", "person"]), ("verbs", &["owns"])]);
        let line = g.tokenize_line(LineState::FactType, "person really owns some car");
        assert_eq!(
            kinds(&line),
            vec![
                (TokenKind::Term, "person"),
                (TokenKind::Text, " "),
                (TokenKind::Other, "really"),
                (TokenKind::Text, " "),
                (TokenKind::Verb, "owns"),
                (TokenKind::Text, " "),
                (TokenKind::Other, "some"),
                (TokenKind::Text, " "),
                (TokenKind::Term, "car"),
            ]
        );
    }

    #[test]
    fn test_fact_type_without_verbs_in_line_is_free_text() {
        let g = grammar(&[("terms", &["car"])]);
        let line = g.tokenize_line(LineState::FactType, "car car");
        assert_eq!(kinds(&line), vec![(TokenKind::FreeText, "car car")]);
        assert_eq!(line.state, LineState::Start);
    }

    #[test]
    fn test_rule_line_uses_scanner() {
        let g = grammar(&[("terms", &["car"])]);
        let line = g.tokenize_line(LineState::Start, "Rule: the car");
        assert_eq!(
            kinds(&line),
            vec![
                (TokenKind::RuleLabel, "Rule:"),
                (TokenKind::Text, " "),
                (TokenKind::Other, "the"),
                (TokenKind::Text, " "),
                (TokenKind::Term, "car"),
            ]
        );
        assert_eq!(line.state, LineState::Start);
    }

    #[test]
    fn test_empty_line_keeps_state() {
        let g = grammar(&[]);
        for state in [LineState::Start, LineState::Term, LineState::FactType, LineState::Rule] {
            let line = g.tokenize_line(state, "");
            assert!(line.tokens.is_empty());
            assert_eq!(line.state, state);
        }
    }

    #[test]
    fn test_tokens_reassemble_line() {
        let g = grammar(&[("terms", &["car", "person"]), ("verbs", &["owns"])]);
        for text in [
            "Fact Type:  the person   owns a car  ",
            "Rule:   It is obligatory that each person owns a car",
            " \t# tabs",
            "random words",
        ] {
            let line = g.tokenize_line(LineState::Start, text);
            let joined: String = line.tokens.iter().map(|t| t.value.as_str()).collect();
            assert_eq!(joined, text);
        }

        let line = g.tokenize_line(LineState::Start, "Fact Type:  the person   owns a car  ");
        assert_eq!(
            kinds(&line),
            vec![
                (TokenKind::FactTypeLabel, "Fact Type:"),
                (TokenKind::Text, "  "),
                (TokenKind::Other, "the"),
                (TokenKind::Text, " "),
                (TokenKind::Term, "person"),
                (TokenKind::Text, "   "),
                (TokenKind::Verb, "owns"),
                (TokenKind::Text, " "),
                (TokenKind::Other, "a"),
                (TokenKind::Text, " "),
                (TokenKind::Term, "car"),
                (TokenKind::Text, "  "),
            ]
        );
    }

    #[test]
    fn test_extra_space_after_label() {
        let g = grammar(&[
            ("terms", &["medicine", "pharmacist"]),
            ("verbs", &["attaches to"]),
        ]);

        let term = g.tokenize_line(LineState::Start, "Term:  medicine");
        assert_eq!(
            kinds(&term),
            vec![
                (TokenKind::TermLabel, "Term:"),
                (TokenKind::Text, "  "),
                (TokenKind::Term, "medicine"),
            ]
        );

        let fact = g.tokenize_line(
            LineState::Start,
            "Fact Type:  the pharmacist attaches to the medicine",
        );
        let significant: Vec<_> = kinds(&fact)
            .into_iter()
            .filter(|(k, _)| *k != TokenKind::Text)
            .collect();
        assert_eq!(
            significant,
            vec![
                (TokenKind::FactTypeLabel, "Fact Type:"),
                (TokenKind::Other, "the"),
                (TokenKind::Term, "pharmacist"),
                (TokenKind::Verb, "attaches to"),
                (TokenKind::Other, "the"),
                (TokenKind::Term, "medicine"),
            ]
        );
    }

    #[test]
    fn test_indented_body_on_next_line() {
        let g = grammar(&[("terms", &["car", "medicine"]), ("verbs", &["owns"])]);

        let term = g.tokenize_line(LineState::Term, "  medicine");
        assert_eq!(
            kinds(&term),
            vec![(TokenKind::Text, "  "), (TokenKind::Term, "medicine")]
        );

        let label = g.tokenize_line(LineState::Start, "Fact Type:   ");
        assert_eq!(label.state, LineState::FactType);
        let fact = g.tokenize_line(label.state, "\tmedicine owns car");
        assert_eq!(fact.tokens[0], Token::text("\t"));
        assert_eq!(fact.tokens[1], Token::new("medicine", TokenKind::Term));
        assert_eq!(fact.state, LineState::Start);
    }

    #[test]
    fn test_split_lines_matches_editor_rows() {
        assert_eq!(split_lines("Term: car\n").collect::<Vec<_>>(), vec!["Term: car", ""]);
        assert_eq!(split_lines("a\r\nb").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(split_lines("").count(), 1);
    }

    #[test]
    fn test_tokenize_document_threads_state() {
        let g = grammar(&[("terms", &["car"])]);
        let lines = g.tokenize_document("Term: \ncar\n\nRule: car\n");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].state, LineState::Term);
        assert_eq!(lines[1].tokens, vec![Token::new("car", TokenKind::Term)]);
        assert!(lines[2].tokens.is_empty());
        assert_eq!(lines[3].tokens[0].kind, TokenKind::RuleLabel);
    }
}
