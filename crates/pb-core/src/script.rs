//! Intent script parser.
//!
//! A small line-oriented command language that compiles to edit intents.
//! Built on `winnow` 0.7. One command per line or `;`-separated; `#`
//! starts a comment.
//!
//! ```text
//! add hero title="Launch day" ctaLabel=Join into section-1 at 0
//! set header-1 title="Hello" padding.top=24
//! remove content-1
//! ```
//!
//! `this` names the prompt's target node; `into page` adds at the top
//! level. An `add` without `into` goes under the target (or the page).

use crate::id::NodeId;
use crate::intent::EditIntent;
use crate::model::{ComponentKind, PropValue, Properties};
use winnow::ascii::{digit1, space0};
use winnow::combinator::delimited;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// A script that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

/// Parse a script into intents. `target` resolves `this` and is the default
/// parent for `add`.
pub fn parse_script(input: &str, target: Option<NodeId>) -> Result<Vec<EditIntent>, ScriptError> {
    let mut intents = Vec::new();

    for (line_no, line) in input.lines().enumerate() {
        let mut rest = line;
        loop {
            skip_space(&mut rest);
            if rest.is_empty() || rest.starts_with('#') {
                break;
            }
            parse_command(&mut rest, target, &mut intents).map_err(|message| ScriptError {
                line: line_no + 1,
                message,
            })?;
            skip_space(&mut rest);
            if let Some(next) = rest.strip_prefix(';') {
                rest = next;
            } else if !(rest.is_empty() || rest.starts_with('#')) {
                return Err(ScriptError {
                    line: line_no + 1,
                    message: format!("unexpected input `{rest}`"),
                });
            }
        }
    }

    Ok(intents)
}

// ─── Commands ───────────────────────────────────────────────────────────

fn parse_command(
    input: &mut &str,
    target: Option<NodeId>,
    out: &mut Vec<EditIntent>,
) -> Result<(), String> {
    let verb = expect(input, parse_identifier, "a command")?;
    skip_space(input);
    match verb {
        "add" => out.push(parse_add(input, target)?),
        "set" => out.extend(parse_set(input, target)?),
        "remove" | "delete" => {
            let node_id = parse_node_ref(input, target)?;
            out.push(EditIntent::RemoveComponent { node_id });
        }
        other => return Err(format!("unknown command `{other}`")),
    }
    Ok(())
}

fn parse_add(input: &mut &str, target: Option<NodeId>) -> Result<EditIntent, String> {
    let kind = expect(input, parse_identifier, "a component kind")?;
    let mut properties = Properties::new();
    let mut parent_id = target;
    let mut index = None;

    loop {
        skip_space(input);
        if input.is_empty() || input.starts_with(';') || input.starts_with('#') {
            break;
        }
        if take_keyword(input, "into") {
            skip_space(input);
            parent_id = if take_keyword(input, "page") {
                None
            } else {
                Some(parse_node_ref(input, target)?)
            };
        } else if take_keyword(input, "at") {
            skip_space(input);
            let digits = expect(input, digit1, "an index after `at`")?;
            index = Some(
                digits
                    .parse::<usize>()
                    .map_err(|e| format!("bad index `{digits}`: {e}"))?,
            );
        } else {
            let (key, value) = expect(input, parse_assignment, "`key=value`")?;
            properties.insert(key, value);
        }
    }

    Ok(EditIntent::AddComponent {
        kind: ComponentKind::parse(kind),
        properties,
        parent_id,
        index,
    })
}

fn parse_set(input: &mut &str, target: Option<NodeId>) -> Result<Vec<EditIntent>, String> {
    let node_id = parse_node_ref(input, target)?;
    let mut intents = Vec::new();
    loop {
        skip_space(input);
        if input.is_empty() || input.starts_with(';') || input.starts_with('#') {
            break;
        }
        let (key, value) = expect(input, parse_assignment, "`key=value`")?;
        intents.push(EditIntent::UpdateProperty {
            node_id,
            key,
            value,
        });
    }
    if intents.is_empty() {
        return Err(format!("`set {node_id}` needs at least one `key=value`"));
    }
    Ok(intents)
}

/// A node id, or `this` for the prompt target.
fn parse_node_ref(input: &mut &str, target: Option<NodeId>) -> Result<NodeId, String> {
    if take_keyword(input, "this") {
        return target.ok_or_else(|| "`this` used without a target component".to_string());
    }
    let id = expect(input, parse_identifier, "a node id")?;
    Ok(NodeId::intern(id))
}

// ─── Low-level parsers ──────────────────────────────────────────────────

/// Run a winnow parser, turning failure into a readable message.
fn expect<'a, O>(
    input: &mut &'a str,
    mut parser: impl Parser<&'a str, O, ErrMode<ContextError>>,
    what: &str,
) -> Result<O, String> {
    let before = *input;
    parser.parse_next(input).map_err(|_| {
        let found: String = before.chars().take(16).collect();
        if found.is_empty() {
            format!("expected {what}, found end of line")
        } else {
            format!("expected {what}, found `{found}`")
        }
    })
}

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    let _: Result<&str, ErrMode<ContextError>> = space0.parse_next(input);
}

/// Consume `word` if it stands alone (followed by whitespace, `;` or end).
fn take_keyword(input: &mut &str, word: &str) -> bool {
    match input.strip_prefix(word) {
        Some(rest) if rest.is_empty() || rest.starts_with([' ', '\t', ';']) => {
            *input = rest;
            true
        }
        _ => false,
    }
}

fn parse_identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '-').parse_next(input)
}

fn parse_key<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
    })
    .parse_next(input)
}

fn parse_quoted_string<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn parse_value(input: &mut &str) -> ModalResult<PropValue> {
    if input.starts_with('"') {
        parse_quoted_string
            .map(|s| PropValue::Text(s.to_string()))
            .parse_next(input)
    } else {
        take_till(1.., |c: char| c.is_whitespace() || matches!(c, ';' | '#'))
            .map(PropValue::parse_input)
            .parse_next(input)
    }
}

fn parse_assignment(input: &mut &str) -> ModalResult<(String, PropValue)> {
    let key = parse_key.parse_next(input)?;
    let _ = '='.parse_next(input)?;
    let value = parse_value.parse_next(input)?;
    Ok((key.to_string(), value))
}
