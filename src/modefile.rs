//! Minimal directive-block reader for the mode-file grammar of spec
//! section 6.
//!
//! This is deliberately not a general GLAEML implementation — spec
//! section 1 lists the GLAEML lexer itself as an external collaborator
//! out of scope. What lives here is the smallest block reader that turns
//! `\directive ... \end` mode-file text into the builder calls the rest
//! of this crate needs: a `ParsedMode` for `Mode::from_source`, and
//! (separately, via `charset.rs::Charset::parse`) charset files, which
//! use the same `\char`/`\virtual` line grammar but no outer blocks.
//!
//! Rule-group bodies (`\rules <name> ... \end`) are handed to
//! `RuleGroup::parse_body` verbatim — that module owns the concrete
//! statement grammar (`var`, `macro`, `deploy`) a rule group accepts, so
//! this reader's job stops at finding where one group's text begins and
//! ends (see `DESIGN.md` for why the mode-file's `\vars {}`/`\def ...
//! \end` spellings are normalized into that grammar here rather than
//! parsed twice).

use crate::error::ParseError;
use crate::options::{OptionValue, OptionsMap};

/// Everything read out of one mode file, before any `RuleGroup` or
/// `Charset` has been built from it.
#[derive(Debug, Clone, Default)]
pub struct ParsedMode {
    pub language: Option<String>,
    pub writing: Option<String>,
    pub charset_name: Option<String>,
    pub option_defaults: OptionsMap,
    pub preprocessor_pairs: Vec<(String, String)>,
    pub strip_accents: bool,
    /// `(group name, raw body text)`, in declaration order.
    pub rule_groups: Vec<(String, String)>,
    pub emit_boundaries: bool,
}

/// Directive keywords whose block is terminated by a bare `\end`, used to
/// track nesting depth (only `\rules` nests, inside `\processor`).
const BLOCK_KEYWORDS: [&str; 4] = ["\\preprocessor", "\\processor", "\\postprocessor", "\\rules"];

pub fn parse_mode_file(source: &str) -> Result<ParsedMode, ParseError> {
    let mut parsed = ParsedMode::default();
    let lines: Vec<&str> = source.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line_no = i + 1;
        let line = strip_comment(lines[i]).trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        if let Some(rest) = line.strip_prefix("\\language") {
            parsed.language = Some(rest.trim().to_string());
            i += 1;
        } else if let Some(rest) = line.strip_prefix("\\writing") {
            parsed.writing = Some(rest.trim().to_string());
            i += 1;
        } else if let Some(rest) = line.strip_prefix("\\charset") {
            parsed.charset_name = Some(rest.trim().to_string());
            i += 1;
        } else if line.starts_with("\\options") {
            let (body, next) = read_brace_block(&lines, i, line_no)?;
            parsed.option_defaults = parse_options_block(&body, line_no)?;
            i = next;
        } else if line.starts_with("\\preprocessor") {
            let (body, next) = read_end_block(&lines, i, line_no)?;
            let (pairs, strip_accents) = parse_preprocessor_block(&body, line_no)?;
            parsed.preprocessor_pairs = pairs;
            parsed.strip_accents = strip_accents;
            i = next;
        } else if line.starts_with("\\processor") {
            let (body, next) = read_end_block(&lines, i, line_no)?;
            parsed.rule_groups = split_rule_groups(&body, line_no)?;
            i = next;
        } else if line.starts_with("\\postprocessor") {
            let (body, next) = read_end_block(&lines, i, line_no)?;
            parsed.emit_boundaries = parse_postprocessor_block(&body);
            i = next;
        } else {
            return Err(ParseError::new(
                line_no,
                1,
                "a recognized mode-file directive",
                line.to_string(),
            ));
        }
    }

    Ok(parsed)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Read from the line after `start` up to (and consuming) the line
/// carrying the matching `\end`, tracking nested block keywords so
/// `\rules` blocks inside `\processor` don't end it early.
fn read_end_block(lines: &[&str], start: usize, line_no: usize) -> Result<(Vec<String>, usize), ParseError> {
    let mut depth = 1usize;
    let mut body = Vec::new();
    let mut i = start + 1;

    while i < lines.len() {
        let raw = lines[i];
        let stripped = strip_comment(raw).trim();
        if stripped == "\\end" {
            depth -= 1;
            if depth == 0 {
                return Ok((body, i + 1));
            }
            body.push(raw.to_string());
        } else {
            if BLOCK_KEYWORDS.iter().any(|kw| stripped.starts_with(kw)) {
                depth += 1;
            }
            body.push(raw.to_string());
        }
        i += 1;
    }

    Err(ParseError::new(line_no, 1, "'\\end'", "end of file".into()))
}

/// Read a `{ ... }` block that may open on the header line itself or
/// span several lines; returns the text strictly between the outermost
/// braces.
fn read_brace_block(lines: &[&str], start: usize, line_no: usize) -> Result<String, ParseError> {
    let mut depth = 0i32;
    let mut body = String::new();
    let mut started = false;

    for raw in &lines[start..] {
        for c in strip_comment(raw).chars() {
            if c == '{' {
                depth += 1;
                if depth == 1 {
                    started = true;
                    continue;
                }
            } else if c == '}' {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
            }
            if started {
                body.push(c);
            }
        }
        body.push('\n');
    }

    Err(ParseError::new(line_no, 1, "'}'", "end of file".into()))
}

fn parse_options_block(body: &str, line_no: usize) -> Result<OptionsMap, ParseError> {
    let mut options = OptionsMap::new();
    for stmt in body.split(|c| c == ';' || c == '\n') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        let (name, default) = stmt
            .split_once(':')
            .ok_or_else(|| ParseError::new(line_no, 1, "'name: default'", stmt.to_string()))?;
        let name = name.trim().to_string();
        let default = default.trim();
        let value = match default {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            quoted if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') => {
                OptionValue::Str(quoted[1..quoted.len() - 1].to_string())
            }
            other => OptionValue::Str(other.to_string()),
        };
        options.insert(name, value);
    }
    Ok(options)
}

/// `"pattern" --> "replacement"` pairs, plus the one recognized bare
/// directive `strip_accents;` that turns on accent-to-base folding (spec
/// 4.4).
fn parse_preprocessor_block(body: &[String], line_no: usize) -> Result<(Vec<(String, String)>, bool), ParseError> {
    let mut pairs = Vec::new();
    let mut strip_accents = false;

    for raw in body {
        let line = strip_comment(raw).trim();
        let line = line.trim_end_matches(';').trim();
        if line.is_empty() {
            continue;
        }
        if line == "strip_accents" {
            strip_accents = true;
            continue;
        }
        let (pattern, replacement) = line
            .split_once("-->")
            .ok_or_else(|| ParseError::new(line_no, 1, "'\"pattern\" --> \"replacement\"'", line.to_string()))?;
        pairs.push((unquote(pattern.trim()), unquote(replacement.trim())));
    }

    Ok((pairs, strip_accents))
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Split a `\processor` block's body into `\rules <name> ... \end`
/// segments; each segment's inner text is forwarded untouched to
/// `RuleGroup::parse_body`.
fn split_rule_groups(body: &[String], line_no: usize) -> Result<Vec<(String, String)>, ParseError> {
    let mut groups = Vec::new();
    let mut i = 0;

    while i < body.len() {
        let line = strip_comment(&body[i]).trim();
        if line.is_empty() {
            i += 1;
            continue;
        }
        let Some(name) = line.strip_prefix("\\rules") else {
            return Err(ParseError::new(line_no, 1, "'\\rules <name>'", line.to_string()));
        };
        let name = name.trim().to_string();

        let mut depth = 1usize;
        let mut inner = Vec::new();
        i += 1;
        loop {
            if i >= body.len() {
                return Err(ParseError::new(line_no, 1, "'\\end'", "end of block".into()));
            }
            let inner_line = strip_comment(&body[i]).trim();
            if inner_line == "\\end" {
                depth -= 1;
                if depth == 0 {
                    i += 1;
                    break;
                }
            } else if BLOCK_KEYWORDS.iter().any(|kw| inner_line.starts_with(kw)) {
                depth += 1;
            }
            inner.push(body[i].clone());
            i += 1;
        }

        groups.push((name, inner.join("\n")));
    }

    Ok(groups)
}

/// `\postprocessor` bodies name the fixed operator chain of spec 4.6 in
/// order; the only thing that varies per mode is whether boundary tokens
/// survive into the rendered output.
fn parse_postprocessor_block(body: &[String]) -> bool {
    body.iter()
        .any(|line| strip_comment(line).trim().trim_end_matches(';') == "emit_boundaries")
}
