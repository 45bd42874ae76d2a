//! Structural extraction of CAPL function reference pages.
//!
//! Source files are semi-free-form markdown with inconsistent heading text,
//! separators and section ordering, so extraction is heading-tolerant: the
//! body is segmented on second-level headings through an alias table, each
//! section is parsed by its own sub-parser, and anything that fails to parse
//! degrades to an empty field instead of an error.

use crate::record::{FunctionRecord, Parameter};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// CAPL type keywords used to tell signature lines apart from prose.
const TYPE_KEYWORDS: &[&str] = &[
    "void", "byte", "word", "dword", "qword", "int", "long", "char", "float", "double",
];

/// `- **name**: description` bullet items (parameters and return values).
static BOLD_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s*\*\*([^*]+)\*\*\s*:?\s*(.*)$").unwrap());

/// Inline code spans within bullet lines.
static CODE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Remainder of a `Valid for` line after the prefix and its markup.
static VALID_FOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)valid\s+for[\]\):*\s]*(.+)").unwrap());

/// Canonical section kinds. Surface headings map here through
/// [`classify_heading`]; new synonyms are additive, not breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Syntax,
    Description,
    Parameters,
    ReturnValues,
    Example,
}

/// Maps surface heading text to a canonical section kind, case-insensitively.
/// Returns `None` for unrecognized headings, whose text then stays with the
/// nearest preceding recognized section.
fn classify_heading(text: &str) -> Option<SectionKind> {
    let normalized = text.trim().trim_end_matches(':').trim().to_lowercase();
    match normalized.as_str() {
        "function syntax" | "method syntax" | "syntax" | "selectors" => Some(SectionKind::Syntax),
        "description" => Some(SectionKind::Description),
        "parameters" | "parameter" => Some(SectionKind::Parameters),
        "return values" | "return value" | "returns" => Some(SectionKind::ReturnValues),
        "example" | "examples" => Some(SectionKind::Example),
        _ => None,
    }
}

/// Raw line buffers per canonical section. Repeated headings of the same kind
/// append here, so "Function Syntax" and "Method Syntax" both contribute
/// their call forms in document order.
#[derive(Default)]
struct Sections {
    syntax: String,
    description: String,
    parameters: String,
    return_values: String,
    example: String,
}

impl Sections {
    fn buffer(&mut self, kind: SectionKind) -> &mut String {
        match kind {
            SectionKind::Syntax => &mut self.syntax,
            SectionKind::Description => &mut self.description,
            SectionKind::Parameters => &mut self.parameters,
            SectionKind::ReturnValues => &mut self.return_values,
            SectionKind::Example => &mut self.example,
        }
    }
}

/// Extracts a [`FunctionRecord`] from one document's text.
///
/// Never fails: malformed markdown degrades to empty optional fields. Inputs
/// that are not decodable as text are rejected before this point, in the
/// corpus loader.
pub fn extract(raw: &str, source_path: &Path) -> FunctionRecord {
    let mut name = String::new();
    let mut valid_for = None;
    let mut sections = Sections::default();
    let mut current: Option<SectionKind> = None;

    for line in raw.lines() {
        if name.is_empty() {
            if let Some(heading) = line.strip_prefix("# ") {
                name = clean_name(heading);
                continue;
            }
        }

        if valid_for.is_none() && is_valid_for_line(line) {
            valid_for = parse_valid_for(line);
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(kind) = classify_heading(heading) {
                current = Some(kind);
                continue;
            }
            // Unrecognized heading: the line and everything under it stay
            // with the current section.
        }

        if let Some(kind) = current {
            let buffer = sections.buffer(kind);
            buffer.push_str(line);
            buffer.push('\n');
        }
    }

    if name.is_empty() {
        name = breadcrumb_name(raw)
            .or_else(|| {
                source_path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
    }

    let example = if sections.example.is_empty() {
        last_fenced_block(raw)
    } else {
        first_fenced_block(&sections.example)
    };

    FunctionRecord {
        name,
        syntax_forms: parse_syntax(&sections.syntax),
        description: parse_description(&sections.description),
        parameters: parse_parameters(&sections.parameters),
        return_values: parse_return_values(&sections.return_values),
        example,
        valid_for,
        source_path: source_path.to_path_buf(),
    }
}

/// Normalizes heading text into a function name: strips backticks and bold
/// markers, and truncates `name: subtitle` and `name<suffix` forms.
fn clean_name(heading: &str) -> String {
    let text = heading.trim().trim_matches('`');
    let text = text.split(':').next().unwrap_or(text);
    let text = text.split('<').next().unwrap_or(text);
    text.trim().trim_matches('*').trim_matches('`').trim().to_string()
}

/// Falls back to a breadcrumb-trail line (`A » B » UdpSend`) when the
/// document carries no top-level heading.
fn breadcrumb_name(raw: &str) -> Option<String> {
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with('-') || trimmed.starts_with('`') {
            continue;
        }
        for separator in ["»", " > "] {
            if trimmed.contains(separator) {
                let last = trimmed.rsplit(separator).next().unwrap_or("").trim();
                if !last.is_empty() && last.len() < 64 {
                    return Some(clean_name(last));
                }
            }
        }
    }
    None
}

fn is_valid_for_line(line: &str) -> bool {
    let trimmed = line.trim_start().trim_start_matches(['[', '*', '>', ' ']);
    trimmed
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("valid for"))
}

/// Captures the applicability list from a `Valid for` line and normalizes it
/// to a comma-joined string.
fn parse_valid_for(line: &str) -> Option<String> {
    let captures = VALID_FOR_RE.captures(line)?;
    let parts: Vec<&str> = captures
        .get(1)?
        .as_str()
        .split(['•', ',', '|'])
        .map(|part| part.trim().trim_matches('*').trim())
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Collects call forms from the syntax section: every non-comment line inside
/// a fenced block, plus code-like bullet items. Prose sentences are ignored
/// as non-signature noise.
fn parse_syntax(text: &str) -> Vec<String> {
    let mut forms = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            if !trimmed.is_empty() && !trimmed.starts_with("//") {
                forms.push(trimmed.to_string());
            }
            continue;
        }

        let Some(body) = bullet_body(trimmed) else {
            continue;
        };
        let mut found_span = false;
        for captures in CODE_SPAN_RE.captures_iter(body) {
            let span = captures[1].trim();
            if looks_like_signature(span) {
                forms.push(span.to_string());
                found_span = true;
            }
        }
        if !found_span {
            let bare = body.trim_matches('`').trim();
            if !bare.is_empty()
                && (has_type_keyword(bare) || (bare.contains('<') && bare.contains('>')))
            {
                forms.push(bare.to_string());
            }
        }
    }
    forms
}

fn looks_like_signature(span: &str) -> bool {
    span.contains('(') || has_type_keyword(span)
}

fn has_type_keyword(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|word| TYPE_KEYWORDS.contains(&word.to_lowercase().as_str()))
}

/// Joins the section's prose into a single normalized string, skipping
/// headings and navigation-link lines.
fn parse_description(text: &str) -> String {
    let mut description = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            continue;
        }
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(trimmed);
    }
    description
}

/// Splits each bullet item into name and description on the first delimiter
/// (bold marker, colon, or em-dash). Items that cannot be split are kept with
/// an empty name and the full text as description, never dropped. Non-bullet
/// lines continue the previous item's description.
fn parse_parameters(text: &str) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(captures) = BOLD_ITEM_RE.captures(line) {
            parameters.push(Parameter {
                name: clean_param_name(&captures[1]),
                description: captures[2].trim().to_string(),
            });
        } else if let Some(body) = bullet_body(trimmed) {
            match split_item(body) {
                Some((name, description)) => parameters.push(Parameter {
                    name: clean_param_name(name),
                    description: description.trim().to_string(),
                }),
                None => parameters.push(Parameter {
                    name: String::new(),
                    description: body.trim().to_string(),
                }),
            }
        } else if let Some(last) = parameters.last_mut() {
            if !last.description.is_empty() {
                last.description.push(' ');
            }
            last.description.push_str(trimmed);
        }
    }
    parameters
}

/// Takes return-value bullets verbatim; `**val**: desc` bold items are
/// normalized to `val: desc`. Numeric codes are not parsed out, callers
/// pattern-match as needed.
fn parse_return_values(text: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(captures) = BOLD_ITEM_RE.captures(line) {
            let value = captures[1].trim();
            let description = captures[2].trim();
            values.push(if description.is_empty() {
                value.to_string()
            } else {
                format!("{value}: {description}")
            });
        } else if let Some(body) = bullet_body(trimmed) {
            if !body.trim().is_empty() {
                values.push(body.trim().to_string());
            }
        } else if let Some(last) = values.last_mut() {
            last.push(' ');
            last.push_str(trimmed);
        }
    }
    values
}

/// Returns the content of a `-` or `*` bullet line, distinguishing `* item`
/// bullets from `**bold**` emphasis.
fn bullet_body(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('-') {
        return Some(rest.trim_start());
    }
    if let Some(rest) = trimmed.strip_prefix('*') {
        if !rest.starts_with('*') {
            return Some(rest.trim_start());
        }
    }
    None
}

/// Splits an item on the first colon or em-dash. Returns `None` when no
/// delimiter with a non-empty name part exists.
fn split_item(item: &str) -> Option<(&str, &str)> {
    let (idx, c) = item
        .char_indices()
        .find(|(_, c)| matches!(c, ':' | '—' | '–'))?;
    let name = item[..idx].trim();
    if name.is_empty() {
        return None;
    }
    Some((name, &item[idx + c.len_utf8()..]))
}

/// Reduces a raw parameter name to the bare identifier: `byte key[]` → `key`.
fn clean_param_name(raw: &str) -> String {
    let raw = raw.trim().trim_matches('`').trim();
    let last = raw.split_whitespace().last().unwrap_or(raw);
    last.trim_matches('`').replace("[]", "").trim_end_matches(':').to_string()
}

/// First fenced code block in the given text, language tag stripped, inner
/// lines verbatim.
fn first_fenced_block(text: &str) -> Option<String> {
    let mut in_fence = false;
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if in_fence {
                return Some(lines.join("\n"));
            }
            in_fence = true;
            continue;
        }
        if in_fence {
            lines.push(line);
        }
    }
    if in_fence && !lines.is_empty() {
        Some(lines.join("\n"))
    } else {
        None
    }
}

/// Last fenced code block anywhere in the document; the fallback when no
/// example heading exists.
fn last_fenced_block(text: &str) -> Option<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            match current.take() {
                Some(lines) => blocks.push(lines.join("\n")),
                None => current = Some(Vec::new()),
            }
            continue;
        }
        if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }
    blocks.pop()
}
