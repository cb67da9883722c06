//! Message templates for the elapsed-time report.
//!
//! A template carries exactly one placeholder for the elapsed value. Both the
//! printf spelling (`%s`, `%d`) and the Rust spelling (`{}`) are accepted;
//! `%%`, `{{` and `}}` stand for literal characters.
//!
//! Templates are checked when a callable is instrumented, so a bad template is
//! a compile-time diagnostic rather than a failure of the instrumented program.

use thiserror::Error;

/// Default template used when the marker does not set one.
pub const DEFAULT_TEMPLATE: &str = "Elapsed %s";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("{0:?} has no placeholder for the elapsed value")]
    MissingPlaceholder(String),

    #[error("{template:?} has {count} placeholders, expected exactly one")]
    TooManyPlaceholders { template: String, count: usize },

    #[error("{template:?} uses unsupported directive `%{directive}`")]
    UnsupportedDirective { template: String, directive: char },

    #[error("{0:?} ends with a dangling `%`")]
    DanglingPercent(String),

    #[error("{0:?} has an unmatched brace, write `{{{{` or `}}}}` for a literal one")]
    UnmatchedBrace(String),
}

/// A validated template, split around its single placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    source: String,
    prefix: String,
    suffix: String,
}

impl MessageTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut placeholders = 0usize;
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            let literal = match c {
                '%' => match chars.next() {
                    Some('s') | Some('d') => None,
                    Some('%') => Some('%'),
                    Some(directive) => {
                        return Err(TemplateError::UnsupportedDirective {
                            template: template.to_string(),
                            directive,
                        })
                    }
                    None => return Err(TemplateError::DanglingPercent(template.to_string())),
                },
                '{' => match chars.next() {
                    Some('}') => None,
                    Some('{') => Some('{'),
                    _ => return Err(TemplateError::UnmatchedBrace(template.to_string())),
                },
                '}' => match chars.next() {
                    Some('}') => Some('}'),
                    _ => return Err(TemplateError::UnmatchedBrace(template.to_string())),
                },
                other => Some(other),
            };

            match literal {
                Some(c) if placeholders == 0 => prefix.push(c),
                Some(c) => suffix.push(c),
                None => placeholders += 1,
            }
        }

        match placeholders {
            0 => Err(TemplateError::MissingPlaceholder(template.to_string())),
            1 => Ok(Self {
                source: template.to_string(),
                prefix,
                suffix,
            }),
            count => Err(TemplateError::TooManyPlaceholders {
                template: template.to_string(),
                count,
            }),
        }
    }

    /// The template as written in the marker.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The equivalent `format_args!` literal with one `{}` slot.
    pub fn format_literal(&self) -> String {
        format!("{}{{}}{}", escape_braces(&self.prefix), escape_braces(&self.suffix))
    }

    /// Renders the message the instrumented code prints for `elapsed`.
    pub fn render(&self, elapsed: u64) -> String {
        format!("{}{}{}", self.prefix, elapsed, self.suffix)
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            prefix: "Elapsed ".to_string(),
            suffix: String::new(),
        }
    }
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
