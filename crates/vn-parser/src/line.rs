use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use vn_core::{CommandKind, LoadError, ScriptCommand, SPEAKER_VARIABLE};

pub const BUILTIN_KEYWORDS: &[&str] = &[
    "label",
    "jump",
    "call",
    "return",
    "end",
    "if",
    "else",
    "endif",
    "choice",
    "set",
    "setglobal",
    "setflag",
    "setglobalflag",
    "speaker",
    "sound",
    "bgm",
    "stopbgm",
    "show",
    "hide",
    "background",
    "wait",
    "anim",
    "effect",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItem {
    Label { name: String, line: usize },
    Command(ScriptCommand),
}

pub fn is_builtin_keyword(name: &str) -> bool {
    BUILTIN_KEYWORDS.contains(&name)
}

pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
    })
}

fn keyword_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:\s*:\s*|\s+|$)")
            .expect("keyword regex must compile")
    })
}

fn speaker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"^([^\s:"][^:"]*?)\s*:\s+(.+)$"#).expect("speaker regex must compile")
    })
}

fn token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#""((?:[^"\\]|\\.)*)"|(\S+)"#).expect("token regex must compile")
    })
}

fn choice_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"^"((?:[^"\\]|\\.)*)"\s*->\s*(\S+)(?:\s+if\s+(.+?))?(?:\s+do\s+(.+?))?\s*$"#)
            .expect("choice regex must compile")
    })
}

/// Splits command arguments on whitespace; double-quoted arguments keep their
/// spaces and support `\"` and `\\` escapes.
pub fn tokenize(rest: &str) -> Vec<String> {
    token_regex()
        .captures_iter(rest)
        .filter_map(|caps| {
            caps.get(1)
                .map(|quoted| unescape(quoted.as_str()))
                .or_else(|| caps.get(2).map(|bare| bare.as_str().to_string()))
        })
        .collect()
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(ch);
    }
    out
}

fn strip_quotes(text: &str) -> String {
    match text.strip_prefix('"') {
        Some(inner) => unescape(inner.strip_suffix('"').unwrap_or(inner)),
        None => text.to_string(),
    }
}

/// Parses one source line. Returns `None` for blank and comment lines.
pub fn parse_line(
    line: &str,
    line_number: usize,
    custom_keywords: &BTreeSet<String>,
) -> Result<Option<LineItem>, LoadError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
        return Ok(None);
    }

    if trimmed.starts_with('"') {
        return Ok(Some(dialogue(trimmed, strip_quotes(trimmed), None, line_number)));
    }

    if let Some(caps) = keyword_regex().captures(trimmed) {
        let full = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let keyword = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let rest = trimmed[full..].trim();

        if is_builtin_keyword(keyword) {
            return build_command(keyword, rest, trimmed, line_number).map(Some);
        }
        if custom_keywords.contains(keyword) {
            return Ok(Some(LineItem::Command(ScriptCommand::new(
                CommandKind::Custom,
                keyword,
                tokenize(rest),
                trimmed,
                line_number,
            ))));
        }
    }

    if let Some(caps) = speaker_regex().captures(trimmed) {
        let speaker = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        return Ok(Some(dialogue(
            trimmed,
            strip_quotes(text),
            Some(speaker.to_string()),
            line_number,
        )));
    }

    Ok(Some(dialogue(trimmed, trimmed.to_string(), None, line_number)))
}

fn dialogue(raw: &str, text: String, speaker: Option<String>, line_number: usize) -> LineItem {
    let mut parameters = vec![text];
    if let Some(speaker) = speaker {
        parameters.push(speaker);
    }
    LineItem::Command(ScriptCommand::new(
        CommandKind::Dialogue,
        "",
        parameters,
        raw,
        line_number,
    ))
}

fn build_command(
    keyword: &str,
    rest: &str,
    raw: &str,
    line_number: usize,
) -> Result<LineItem, LoadError> {
    let tokens = tokenize(rest);
    let command = |kind: CommandKind, parameters: Vec<String>| -> Result<LineItem, LoadError> {
        Ok(LineItem::Command(ScriptCommand::new(
            kind,
            keyword,
            parameters,
            raw,
            line_number,
        )))
    };

    match keyword {
        "label" => {
            let [name] = exact::<1>(keyword, tokens, line_number)?;
            Ok(LineItem::Label {
                name,
                line: line_number,
            })
        }
        "jump" => command(
            CommandKind::Jump,
            exact::<1>(keyword, tokens, line_number)?.to_vec(),
        ),
        "call" => command(
            CommandKind::Call,
            exact::<1>(keyword, tokens, line_number)?.to_vec(),
        ),
        "return" => {
            exact::<0>(keyword, tokens, line_number)?;
            command(CommandKind::Return, Vec::new())
        }
        "end" => {
            exact::<0>(keyword, tokens, line_number)?;
            command(CommandKind::End, Vec::new())
        }
        "if" => {
            if rest.is_empty() {
                return Err(LoadError::malformed(
                    keyword,
                    line_number,
                    "expected a condition",
                ));
            }
            command(CommandKind::Condition, vec![rest.to_string()])
        }
        "else" => {
            exact::<0>(keyword, tokens, line_number)?;
            command(CommandKind::Else, Vec::new())
        }
        "endif" => {
            exact::<0>(keyword, tokens, line_number)?;
            command(CommandKind::EndIf, Vec::new())
        }
        "choice" => command(CommandKind::Choice, parse_choice(rest, line_number)?),
        "set" | "setglobal" => command(
            CommandKind::SetVariable,
            parse_set(keyword, rest, tokens, line_number)?,
        ),
        "setflag" | "setglobalflag" => {
            let [name, value] = exact::<2>(keyword, tokens, line_number)?;
            require_identifier(keyword, &name, line_number)?;
            if value != "true" && value != "false" {
                return Err(LoadError::malformed(
                    keyword,
                    line_number,
                    format!("flag value must be true or false, got \"{}\"", value),
                ));
            }
            command(CommandKind::SetFlag, vec![name, value])
        }
        "speaker" => {
            if tokens.is_empty() {
                return Err(LoadError::malformed(
                    keyword,
                    line_number,
                    "expected a speaker name",
                ));
            }
            command(
                CommandKind::SetVariable,
                vec![SPEAKER_VARIABLE.to_string(), tokens.join(" ")],
            )
        }
        "sound" => command(
            CommandKind::PlaySound,
            exact::<1>(keyword, tokens, line_number)?.to_vec(),
        ),
        "bgm" => command(
            CommandKind::PlayBgm,
            exact::<1>(keyword, tokens, line_number)?.to_vec(),
        ),
        "stopbgm" => {
            exact::<0>(keyword, tokens, line_number)?;
            command(CommandKind::StopBgm, Vec::new())
        }
        "show" => command(
            CommandKind::ShowCharacter,
            at_least(keyword, tokens, 1, line_number)?,
        ),
        "hide" => command(
            CommandKind::HideCharacter,
            exact::<1>(keyword, tokens, line_number)?.to_vec(),
        ),
        "background" => command(
            CommandKind::ChangeBackground,
            exact::<1>(keyword, tokens, line_number)?.to_vec(),
        ),
        "wait" => {
            let [seconds] = exact::<1>(keyword, tokens, line_number)?;
            match seconds.parse::<f32>() {
                Ok(value) if value.is_finite() && value >= 0.0 => {
                    command(CommandKind::Wait, vec![seconds])
                }
                _ => Err(LoadError::malformed(
                    keyword,
                    line_number,
                    format!("expected a non-negative duration, got \"{}\"", seconds),
                )),
            }
        }
        "anim" => command(
            CommandKind::Animation,
            at_least(keyword, tokens, 1, line_number)?,
        ),
        "effect" => command(
            CommandKind::SpecialEffect,
            at_least(keyword, tokens, 1, line_number)?,
        ),
        _ => Err(LoadError::malformed(
            keyword,
            line_number,
            "unsupported keyword",
        )),
    }
}

fn exact<const N: usize>(
    keyword: &str,
    tokens: Vec<String>,
    line_number: usize,
) -> Result<[String; N], LoadError> {
    let count = tokens.len();
    tokens.try_into().map_err(|_| {
        LoadError::malformed(
            keyword,
            line_number,
            format!("expected {} parameter(s), got {}", N, count),
        )
    })
}

fn at_least(
    keyword: &str,
    tokens: Vec<String>,
    min: usize,
    line_number: usize,
) -> Result<Vec<String>, LoadError> {
    if tokens.len() < min {
        return Err(LoadError::malformed(
            keyword,
            line_number,
            format!("expected at least {} parameter(s), got {}", min, tokens.len()),
        ));
    }
    Ok(tokens)
}

fn require_identifier(keyword: &str, name: &str, line_number: usize) -> Result<(), LoadError> {
    if is_identifier(name) {
        return Ok(());
    }
    Err(LoadError::malformed(
        keyword,
        line_number,
        format!("\"{}\" is not a valid name", name),
    ))
}

fn parse_set(
    keyword: &str,
    rest: &str,
    tokens: Vec<String>,
    line_number: usize,
) -> Result<Vec<String>, LoadError> {
    let Some(name) = tokens.first().cloned() else {
        return Err(LoadError::malformed(
            keyword,
            line_number,
            "expected a variable name and value",
        ));
    };
    require_identifier(keyword, &name, line_number)?;

    let after_name = rest.strip_prefix(name.as_str()).unwrap_or_default();
    if let Some(expression) = after_name.trim_start().strip_prefix('=') {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(LoadError::malformed(
                keyword,
                line_number,
                "expected an expression after `=`",
            ));
        }
        return Ok(vec![name, "=".to_string(), expression.to_string()]);
    }

    if tokens.len() < 2 {
        return Err(LoadError::malformed(
            keyword,
            line_number,
            "expected a variable name and value",
        ));
    }
    Ok(vec![name, tokens[1..].join(" ")])
}

fn parse_choice(rest: &str, line_number: usize) -> Result<Vec<String>, LoadError> {
    let Some(caps) = choice_regex().captures(rest) else {
        return Err(LoadError::malformed(
            "choice",
            line_number,
            "expected `choice \"TEXT\" -> LABEL [if CONDITION] [do EFFECT; ...]`",
        ));
    };

    let text = caps.get(1).map(|m| unescape(m.as_str())).unwrap_or_default();
    let target = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
    let condition = caps
        .get(3)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let mut parameters = vec![text, target, condition];
    if let Some(effects) = caps.get(4) {
        for effect in effects.as_str().split(';') {
            let effect = effect.trim();
            if effect.is_empty() {
                continue;
            }
            validate_effect(effect, line_number)?;
            parameters.push(effect.to_string());
        }
    }
    Ok(parameters)
}

fn validate_effect(effect: &str, line_number: usize) -> Result<(), LoadError> {
    let item = parse_line(effect, line_number, &BTreeSet::new())?;
    match item {
        Some(LineItem::Command(command))
            if matches!(
                command.kind,
                CommandKind::SetVariable | CommandKind::SetFlag
            ) =>
        {
            Ok(())
        }
        _ => Err(LoadError::malformed(
            "choice",
            line_number,
            format!("effect \"{}\" must be a set or setflag command", effect),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> LineItem {
        parse_line(line, 1, &BTreeSet::new())
            .expect("line should parse")
            .expect("line should not be skipped")
    }

    fn command(line: &str) -> ScriptCommand {
        match parse(line) {
            LineItem::Command(command) => command,
            other => panic!("expected command, got {:?}", other),
        }
    }

    fn malformed(line: &str) -> LoadError {
        parse_line(line, 5, &BTreeSet::new()).expect_err("line should be rejected")
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let custom = BTreeSet::new();
        assert_eq!(parse_line("   ", 1, &custom).expect("blank"), None);
        assert_eq!(parse_line("# note", 2, &custom).expect("hash"), None);
        assert_eq!(parse_line("  // note", 3, &custom).expect("slash"), None);
    }

    #[test]
    fn labels_accept_colon_and_space_forms() {
        assert_eq!(
            parse("label:intro"),
            LineItem::Label {
                name: "intro".to_string(),
                line: 1
            }
        );
        assert_eq!(
            parse("label  ending_b"),
            LineItem::Label {
                name: "ending_b".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn jump_accepts_colon_form() {
        let jump = command("jump:b");
        assert_eq!(jump.kind, CommandKind::Jump);
        assert_eq!(jump.parameters, vec!["b"]);
        assert_eq!(jump.keyword, "jump");
    }

    #[test]
    fn bare_text_is_dialogue() {
        let line = command("Hello there, traveller.");
        assert_eq!(line.kind, CommandKind::Dialogue);
        assert_eq!(line.parameters, vec!["Hello there, traveller."]);
        assert!(line.keyword.is_empty());
    }

    #[test]
    fn speaker_prefix_is_split_from_dialogue() {
        let line = command("Mr. Grey: \"Wait for me!\"");
        assert_eq!(line.kind, CommandKind::Dialogue);
        assert_eq!(line.parameters, vec!["Wait for me!", "Mr. Grey"]);
    }

    #[test]
    fn quoted_line_is_dialogue_even_when_it_starts_with_a_keyword() {
        let line = command("\"wait for me\"");
        assert_eq!(line.kind, CommandKind::Dialogue);
        assert_eq!(line.parameters, vec!["wait for me"]);
    }

    #[test]
    fn urls_are_not_mistaken_for_speakers() {
        let line = command("see https://example.org");
        assert_eq!(line.parameters, vec!["see https://example.org"]);
    }

    #[test]
    fn tokenize_keeps_quoted_spaces() {
        assert_eq!(
            tokenize(r#"alice "very happy" left"#),
            vec!["alice", "very happy", "left"]
        );
        assert_eq!(tokenize(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn set_supports_literal_and_expression_forms() {
        let literal = command("set name Alice Smith");
        assert_eq!(literal.kind, CommandKind::SetVariable);
        assert_eq!(literal.parameters, vec!["name", "Alice Smith"]);

        let quoted = command(r#"set title "The  Duke""#);
        assert_eq!(quoted.parameters, vec!["title", "The  Duke"]);

        let expression = command("set gold = gold + 10");
        assert_eq!(expression.parameters, vec!["gold", "=", "gold + 10"]);

        let global = command("setglobal chapter 2");
        assert_eq!(global.keyword, "setglobal");
        assert_eq!(global.parameters, vec!["chapter", "2"]);
    }

    #[test]
    fn speaker_command_sets_reserved_variable() {
        let speaker = command("speaker Old Man");
        assert_eq!(speaker.kind, CommandKind::SetVariable);
        assert_eq!(speaker.parameters, vec![SPEAKER_VARIABLE, "Old Man"]);
    }

    #[test]
    fn presentation_commands_collect_arguments() {
        let show = command(r#"show alice "smile wide" left"#);
        assert_eq!(show.kind, CommandKind::ShowCharacter);
        assert_eq!(show.parameters, vec!["alice", "smile wide", "left"]);
        assert_eq!(command("stopbgm").kind, CommandKind::StopBgm);
        assert_eq!(command("bgm town.ogg").kind, CommandKind::PlayBgm);
        assert_eq!(command("background forest").kind, CommandKind::ChangeBackground);
        assert_eq!(command("effect shake 0.5").parameters, vec!["shake", "0.5"]);
    }

    #[test]
    fn choice_line_extracts_text_target_condition_and_effects() {
        let choice = command(
            r#"choice "Buy the sword" -> shop if gold >= 10 do set gold = gold - 10; setflag armed true"#,
        );
        assert_eq!(choice.kind, CommandKind::Choice);
        assert_eq!(
            choice.parameters,
            vec![
                "Buy the sword",
                "shop",
                "gold >= 10",
                "set gold = gold - 10",
                "setflag armed true"
            ]
        );

        let plain = command(r#"choice "Leave"->outside"#);
        assert_eq!(plain.parameters, vec!["Leave", "outside", ""]);
    }

    #[test]
    fn custom_keywords_are_recognised_when_registered() {
        let mut custom = BTreeSet::new();
        custom.insert("shake".to_string());
        let item = parse_line("shake screen 3", 9, &custom)
            .expect("line should parse")
            .expect("line should not be skipped");
        let LineItem::Command(custom_command) = item else {
            panic!("expected command");
        };
        assert_eq!(custom_command.kind, CommandKind::Custom);
        assert_eq!(custom_command.keyword, "shake");
        assert_eq!(custom_command.parameters, vec!["screen", "3"]);

        assert_eq!(command("shake screen 3").kind, CommandKind::Dialogue);
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert!(matches!(
            malformed("jump"),
            LoadError::MalformedCommand { ref keyword, line: 5, .. } if keyword == "jump"
        ));
        assert!(matches!(malformed("jump a b"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("wait soon"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("wait -1"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("setflag seen maybe"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("set 9lives 1"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("set gold"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("set gold ="), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("if"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("return now"), LoadError::MalformedCommand { .. }));
        assert!(matches!(malformed("choice Leave -> out"), LoadError::MalformedCommand { .. }));
        assert!(matches!(
            malformed(r#"choice "Go" -> out do jump elsewhere"#),
            LoadError::MalformedCommand { .. }
        ));
    }

    #[test]
    fn prose_opening_with_a_keyword_needs_quotes() {
        assert_eq!(command("show me the way").kind, CommandKind::ShowCharacter);
        assert_eq!(command("if only I had known").kind, CommandKind::Condition);
        assert!(matches!(
            malformed("end of the road"),
            LoadError::MalformedCommand { ref keyword, .. } if keyword == "end"
        ));

        for line in [r#""show me the way""#, r#""end of the road""#] {
            let quoted = command(line);
            assert_eq!(quoted.kind, CommandKind::Dialogue);
            assert_eq!(quoted.parameters, vec![&line[1..line.len() - 1]]);
        }
        assert_eq!(command("Show me the way").kind, CommandKind::Dialogue);
    }
}
