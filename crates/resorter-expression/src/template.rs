//! Path templates: literal text with `{expression}` groups, split on `/`.

use crate::error::{EvalError, ParseError};
use crate::eval_ctx::EvalCtx;
use crate::evaluate::Expression;
use crate::operand::Subject;
use crate::registry::Registry;
use crate::value::Value;
use std::path::PathBuf;

/// What an `Absent` group renders as.
pub const ABSENT_MARK: &str = "?";

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Group(Expression),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    text: String,
    segments: Vec<Vec<Part>>,
}

/// Splits `text` into path segments of raw parts. Group text is returned
/// without its braces. Quotes only matter inside groups.
fn scan(text: &str) -> Result<Vec<Vec<(bool, String)>>, ParseError> {
    let mut segments = vec![Vec::new()];
    let mut current = String::new();
    let mut in_group = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if in_group {
            if let Some(q) = quote {
                current.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '}' => {
                    let group = std::mem::take(&mut current);
                    if let Some(segment) = segments.last_mut() {
                        segment.push((true, group));
                    }
                    in_group = false;
                }
                _ => current.push(c),
            }
            continue;
        }
        match c {
            '{' => {
                if !current.is_empty() {
                    let literal = std::mem::take(&mut current);
                    if let Some(segment) = segments.last_mut() {
                        segment.push((false, literal));
                    }
                }
                in_group = true;
            }
            '/' => {
                if !current.is_empty() {
                    let literal = std::mem::take(&mut current);
                    if let Some(segment) = segments.last_mut() {
                        segment.push((false, literal));
                    }
                }
                segments.push(Vec::new());
            }
            _ => current.push(c),
        }
    }
    if in_group {
        return Err(ParseError::UnclosedGroup(text.to_string()));
    }
    if !current.is_empty() {
        if let Some(segment) = segments.last_mut() {
            segment.push((false, current));
        }
    }
    Ok(segments)
}

impl Template {
    pub fn parse(text: &str, registry: &Registry) -> Result<Self, ParseError> {
        let segments = scan(text)?
            .into_iter()
            .map(|segment| {
                segment
                    .into_iter()
                    .map(|(group, part)| {
                        if group {
                            Expression::parse(&part, registry).map(Part::Group)
                        } else {
                            Ok(Part::Literal(part))
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Template {
            text: text.to_string(),
            segments,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.segments.iter().flatten().filter_map(|part| match part {
            Part::Group(expr) => Some(expr),
            Part::Literal(_) => None,
        })
    }

    /// Renders every segment and joins them with `/`.
    pub fn render(&self, subject: &Subject, ctx: &mut EvalCtx) -> Result<String, EvalError> {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            for part in segment {
                match part {
                    Part::Literal(text) => out.push_str(text),
                    Part::Group(expr) => match expr.evaluate(subject, ctx)? {
                        Value::Absent => out.push_str(ABSENT_MARK),
                        value => out.push_str(&value.to_string()),
                    },
                }
            }
        }
        Ok(out)
    }

    pub fn render_path(&self, subject: &Subject, ctx: &mut EvalCtx) -> Result<PathBuf, EvalError> {
        self.render(subject, ctx).map(PathBuf::from)
    }

    /// The typed value of a template made of a single group, the rendered
    /// string otherwise.
    pub fn value(&self, subject: &Subject, ctx: &mut EvalCtx) -> Result<Value, EvalError> {
        if let [segment] = self.segments.as_slice() {
            if let [Part::Group(expr)] = segment.as_slice() {
                return expr.evaluate(subject, ctx);
            }
        }
        self.render(subject, ctx).map(Value::Str)
    }
}
