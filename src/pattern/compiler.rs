use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PatternIssue, Result, RouteError};

/// Characters that terminate a variable's default character class when they
/// directly precede or follow it in the template.
pub const SEPARATORS: &str = "/,;.:-_~+*";

/// Longest accepted variable name.
pub const VARIABLE_MAXIMUM_LENGTH: usize = 32;

/// `{name}`, `{!name}` and `{name?}` occurrences.
static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(!)?([0-9A-Za-z_\x{80}-\x{10FFFF}]+)(\?)?\}")
        .expect("variable scanner regex is valid")
});

/// One piece of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Token {
    /// Literal text matched verbatim.
    Text { text: String },
    /// A captured variable, with the separator that precedes it (if any).
    Variable {
        separator: Option<char>,
        pattern: String,
        name: String,
        /// Regex group holding the value. Variable names may contain
        /// characters the regex crate rejects in group names.
        group: String,
        #[serde(default)]
        important: bool,
    },
}

/// Result of compiling a template: the anchored regex plus the token and
/// variable lists used for reconstruction and parameter binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CompiledPatternRepr", into = "CompiledPatternRepr")]
pub struct CompiledPattern {
    regex: Regex,
    host: bool,
    static_prefix: String,
    tokens: Vec<Token>,
    variables: Vec<String>,
}

impl CompiledPattern {
    /// The anchored (`^...$`) regex.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Tokens in reverse template order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Variable names in left-to-right template order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Literal prefix every matching path must start with.
    #[must_use]
    pub fn static_prefix(&self) -> &str {
        &self.static_prefix
    }

    /// Whether this pattern was compiled for a domain.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.host
    }

    /// Captured variables for `subject` in template order, keyed by variable
    /// name. Empty captures (unmatched optional variables) are left out.
    #[must_use]
    pub fn captures<'s>(&self, subject: &'s str) -> Option<Vec<(&str, &'s str)>> {
        let caps = self.regex.captures(subject)?;
        Some(
            self.variables
                .iter()
                .enumerate()
                .filter_map(|(index, name)| {
                    caps.name(&group_name(index))
                        .map(|m| m.as_str())
                        .filter(|value| !value.is_empty())
                        .map(|value| (name.as_str(), value))
                })
                .collect(),
        )
    }

    /// Test a (decoded) subject against the pattern.
    #[must_use]
    pub fn is_match(&self, subject: &str) -> bool {
        if !self.host && !subject.starts_with(self.static_prefix.as_str()) {
            return false;
        }
        self.regex.is_match(subject)
    }
}

#[derive(Serialize, Deserialize)]
struct CompiledPatternRepr {
    regex: String,
    #[serde(default)]
    host: bool,
    #[serde(default)]
    static_prefix: String,
    tokens: Vec<Token>,
    variables: Vec<String>,
}

impl TryFrom<CompiledPatternRepr> for CompiledPattern {
    type Error = RouteError;

    fn try_from(repr: CompiledPatternRepr) -> Result<Self> {
        Ok(Self {
            regex: build_regex(&repr.regex, repr.host)?,
            host: repr.host,
            static_prefix: repr.static_prefix,
            tokens: repr.tokens,
            variables: repr.variables,
        })
    }
}

impl From<CompiledPattern> for CompiledPatternRepr {
    fn from(compiled: CompiledPattern) -> Self {
        Self {
            regex: compiled.regex.as_str().to_string(),
            host: compiled.host,
            static_prefix: compiled.static_prefix,
            tokens: compiled.tokens,
            variables: compiled.variables,
        }
    }
}

/// Compiles URI and domain templates.
///
/// By default a path template is compiled with no extra constraints. Use
/// [`PatternCompiler::host`] for domain templates and
/// [`PatternCompiler::requirements`] to narrow individual variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternCompiler<'a> {
    host: bool,
    requirements: Option<&'a HashMap<String, String>>,
}

/// Compile a path template with default options.
pub fn compile(template: &str) -> Result<CompiledPattern> {
    PatternCompiler::new().compile(template)
}

impl<'a> PatternCompiler<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile as a domain template: `.` is the default separator, matching is
    /// case-insensitive and variables are never optional.
    #[must_use]
    pub fn host(mut self) -> Self {
        self.host = true;
        self
    }

    /// Per-variable regex constraints. A constrained variable uses the given
    /// regex (stripped of `^`/`$` anchors) instead of its default class.
    #[must_use]
    pub fn requirements(mut self, requirements: &'a HashMap<String, String>) -> Self {
        self.requirements = Some(requirements);
        self
    }

    /// Compile `template` into a [`CompiledPattern`].
    pub fn compile(&self, template: &str) -> Result<CompiledPattern> {
        let pattern = if self.host {
            template.trim().to_string()
        } else {
            format!("/{}", template.trim().trim_start_matches('/'))
        };
        self.compile_pattern(&pattern)
    }

    fn compile_pattern(&self, pattern: &str) -> Result<CompiledPattern> {
        let default_separator = if self.host { '.' } else { '/' };
        let mut tokens: Vec<Token> = Vec::new();
        let mut variables: Vec<String> = Vec::new();
        let mut optional: Vec<bool> = Vec::new();
        let mut pos = 0;

        for caps in VARIABLE.captures_iter(pattern) {
            let Some(whole) = caps.get(0) else { continue };
            let important = caps.get(1).is_some();
            let name = caps.get(2).map_or("", |m| m.as_str());
            let is_optional = caps.get(3).is_some();

            let preceding = &pattern[pos..whole.start()];
            pos = whole.end();

            let preceding_char = preceding.chars().last();
            let separator = preceding_char.filter(|c| SEPARATORS.contains(*c));

            validate_name(pattern, name, &variables)?;

            match separator {
                Some(sep) if preceding.len() > sep.len_utf8() => tokens.push(Token::Text {
                    text: preceding[..preceding.len() - sep.len_utf8()].to_string(),
                }),
                None if !preceding.is_empty() => tokens.push(Token::Text {
                    text: preceding.to_string(),
                }),
                _ => {}
            }

            let requirement = self.requirements.and_then(|r| r.get(name));
            let sub_pattern = match requirement {
                Some(raw) => sanitize_requirement(pattern, name, raw)?,
                None => {
                    // The regex engine never backtracks, so the class does not need
                    // a possessive quantifier when a terminator follows.
                    let next = find_next_separator(&pattern[pos..]);
                    let mut class = format!("[^{}", escape_char(default_separator));
                    if let Some(next) = next.filter(|c| *c != default_separator) {
                        class.push_str(&escape_char(next));
                    }
                    class.push_str("]+");
                    class
                }
            };

            tokens.push(Token::Variable {
                separator,
                pattern: sub_pattern,
                name: name.to_string(),
                group: group_name(variables.len()),
                important,
            });
            variables.push(name.to_string());
            optional.push(is_optional && !self.host);
        }

        if pos < pattern.len() {
            tokens.push(Token::Text {
                text: pattern[pos..].to_string(),
            });
        }

        let first_optional = first_optional_token(&tokens, &variables, &optional);

        let mut source = String::with_capacity(pattern.len() * 2);
        source.push('^');
        for index in 0..tokens.len() {
            source.push_str(&compute_regexp(&tokens, index, first_optional));
        }
        source.push('$');

        let regex = build_regex(&source, self.host)?;
        let static_prefix = determine_static_prefix(&tokens, &variables, &optional);
        tokens.reverse();

        Ok(CompiledPattern {
            regex,
            host: self.host,
            static_prefix,
            tokens,
            variables,
        })
    }
}

fn validate_name(pattern: &str, name: &str, seen: &[String]) -> Result<()> {
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(RouteError::invalid_pattern(
            pattern,
            PatternIssue::LeadingDigit(name.to_string()),
        ));
    }
    if seen.iter().any(|v| v == name) {
        return Err(RouteError::invalid_pattern(
            pattern,
            PatternIssue::Duplicate(name.to_string()),
        ));
    }
    if name.chars().count() > VARIABLE_MAXIMUM_LENGTH {
        return Err(RouteError::invalid_pattern(
            pattern,
            PatternIssue::TooLong(name.to_string()),
        ));
    }
    Ok(())
}

/// Strip anchors from a user supplied constraint; empty constraints are rejected.
fn sanitize_requirement(pattern: &str, name: &str, raw: &str) -> Result<String> {
    let mut regex = raw;
    if let Some(rest) = regex.strip_prefix('^') {
        regex = rest;
    } else if let Some(rest) = regex.strip_prefix(r"\A") {
        regex = rest;
    }
    if let Some(rest) = regex.strip_suffix('$') {
        regex = rest;
    } else if let Some(rest) = regex.strip_suffix(r"\z") {
        regex = rest;
    }
    if regex.is_empty() {
        return Err(RouteError::invalid_pattern(
            pattern,
            PatternIssue::EmptyRequirement(name.to_string()),
        ));
    }
    Ok(regex.to_string())
}

/// First static character after the variable, if it is a separator.
/// Placeholders are skipped so `{a}{b}.json` yields `.` for `a`.
fn find_next_separator(following: &str) -> Option<char> {
    if following.is_empty() {
        return None;
    }
    let stripped = VARIABLE.replace_all(following, "");
    stripped.chars().next().filter(|c| SEPARATORS.contains(*c))
}

/// Index of the first token of the trailing run of optional variables.
fn first_optional_token(tokens: &[Token], variables: &[String], optional: &[bool]) -> usize {
    let mut first = usize::MAX;
    for (index, token) in tokens.iter().enumerate().rev() {
        match token {
            Token::Variable {
                name, important, ..
            } if !important && is_optional(name, variables, optional) => first = index,
            _ => break,
        }
    }
    first
}

fn is_optional(name: &str, variables: &[String], optional: &[bool]) -> bool {
    variables
        .iter()
        .position(|v| v == name)
        .and_then(|i| optional.get(i).copied())
        .unwrap_or(false)
}

fn compute_regexp(tokens: &[Token], index: usize, first_optional: usize) -> String {
    match &tokens[index] {
        Token::Text { text } => regex::escape(text),
        Token::Variable {
            separator,
            pattern,
            group,
            ..
        } => {
            let sep = separator.map(escape_char).unwrap_or_default();
            // A lone optional variable keeps its separator mandatory.
            if index == 0 && first_optional == 0 {
                return format!("{sep}(?P<{group}>{pattern})?");
            }
            let mut regexp = format!("{sep}(?P<{group}>{pattern})");
            if index >= first_optional {
                regexp = format!("(?:{regexp}");
                let count = tokens.len();
                if index == count - 1 {
                    let closing = count - first_optional - usize::from(first_optional == 0);
                    regexp.push_str(&")?".repeat(closing));
                }
            }
            regexp
        }
    }
}

fn determine_static_prefix(tokens: &[Token], variables: &[String], optional: &[bool]) -> String {
    match tokens.first() {
        None => String::new(),
        Some(Token::Variable {
            separator, name, ..
        }) => match separator {
            Some(sep) if *sep != '/' && !is_optional(name, variables, optional) => sep.to_string(),
            _ => String::new(),
        },
        Some(Token::Text { text }) => {
            let mut prefix = text.clone();
            if let Some(Token::Variable {
                separator: Some(sep),
                name,
                ..
            }) = tokens.get(1)
            {
                if *sep != '/' && !is_optional(name, variables, optional) {
                    prefix.push(*sep);
                }
            }
            prefix
        }
    }
}

/// Group name of the variable at `index` in template order.
fn group_name(index: usize) -> String {
    format!("v{index}")
}

fn escape_char(c: char) -> String {
    let mut buf = [0u8; 4];
    regex::escape(c.encode_utf8(&mut buf))
}

fn build_regex(source: &str, host: bool) -> Result<Regex> {
    RegexBuilder::new(source)
        .dot_matches_new_line(true)
        .case_insensitive(host)
        .build()
        .map_err(|e| RouteError::invalid_pattern(source, PatternIssue::Regex(e.to_string())))
}
