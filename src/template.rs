//! Message template parsing and rendering
//!
//! Templates are parsed once at middleware construction and shared between
//! every event the middleware emits. A template is plain text with `{Name}`
//! holes; `{{` and `}}` escape literal braces, and a hole may carry a numeric
//! format hint such as `{Elapsed:0.0000}` (fractional digit count).

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::ConfigError;

/// A parsed message template.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    raw: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Hole {
        name: String,
        format: Option<String>,
    },
}

impl MessageTemplate {
    /// Parse a template string. An empty or blank template and an unclosed
    /// hole are configuration errors; a closed hole with a malformed name
    /// degrades to literal text rather than failing, matching the tolerant
    /// behavior expected of a logging layer.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::MissingMessageTemplate);
        }

        let mut tokens = Vec::new();
        let mut text = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        body.push(next);
                    }

                    if !closed {
                        return Err(ConfigError::InvalidMessageTemplate {
                            message: format!("unclosed property hole `{{{body}`"),
                        });
                    }

                    match parse_hole(&body) {
                        Some((name, format)) => {
                            if !text.is_empty() {
                                tokens.push(Token::Text(std::mem::take(&mut text)));
                            }
                            tokens.push(Token::Hole { name, format });
                        }
                        None => {
                            // Malformed name, keep the hole literal.
                            text.push('{');
                            text.push_str(&body);
                            text.push('}');
                        }
                    }
                }
                other => text.push(other),
            }
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }

        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    /// The original template text.
    pub fn text(&self) -> &str {
        &self.raw
    }

    /// Names of the property holes, in order of appearance.
    pub fn hole_names(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Hole { name, .. } => Some(name.as_str()),
                Token::Text(_) => None,
            })
            .collect()
    }

    /// Render the template against a property map. Holes without a matching
    /// property render as their literal `{Name}` text; this is not an error
    /// at this layer.
    pub fn render(&self, properties: &HashMap<String, Value>) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for token in &self.tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Hole { name, format } => match properties.get(name) {
                    Some(value) => render_value(&mut out, value, format.as_deref()),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        if let Some(format) = format {
                            out.push(':');
                            out.push_str(format);
                        }
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

fn parse_hole(body: &str) -> Option<(String, Option<String>)> {
    let (name, format) = match body.split_once(':') {
        Some((name, format)) => (name, Some(format.to_string())),
        None => (body, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some((name.to_string(), format))
}

fn render_value(out: &mut String, value: &Value, format: Option<&str>) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Number(n) => {
            let precision = format
                .and_then(|f| f.split_once('.'))
                .map(|(_, frac)| frac.len());
            match (precision, n.as_f64()) {
                (Some(precision), Some(float)) => {
                    out.push_str(&format!("{:.*}", precision, float));
                }
                _ => out.push_str(&n.to_string()),
            }
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn properties(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn rejects_blank_template() {
        assert!(matches!(
            MessageTemplate::parse("   "),
            Err(ConfigError::MissingMessageTemplate)
        ));
    }

    #[test]
    fn parses_default_template_holes() {
        let template = MessageTemplate::parse(
            "HTTP {RequestMethod} {RequestPath} responded {StatusCode} in {Elapsed:0.0000} ms",
        )
        .unwrap();
        assert_eq!(
            template.hole_names(),
            vec!["RequestMethod", "RequestPath", "StatusCode", "Elapsed"]
        );
    }

    #[test]
    fn renders_with_numeric_format() {
        let template = MessageTemplate::parse("took {Elapsed:0.0000} ms").unwrap();
        let rendered = template.render(&properties(&[("Elapsed", json!(12.34567))]));
        assert_eq!(rendered, "took 12.3457 ms");
    }

    #[test]
    fn renders_missing_hole_as_literal() {
        let template = MessageTemplate::parse("hello {Missing}").unwrap();
        assert_eq!(template.render(&HashMap::new()), "hello {Missing}");
    }

    #[test]
    fn escaped_braces_stay_literal() {
        let template = MessageTemplate::parse("{{not_a_hole}} {Real}").unwrap();
        let rendered = template.render(&properties(&[("Real", json!("yes"))]));
        assert_eq!(rendered, "{not_a_hole} yes");
    }

    #[test]
    fn unclosed_hole_fails_parsing() {
        let result = MessageTemplate::parse("took {Elapsed ms");
        match result {
            Err(ConfigError::InvalidMessageTemplate { message }) => {
                assert!(message.contains("unclosed"));
            }
            other => panic!("expected invalid-template error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_hole_degrades_to_text() {
        let template = MessageTemplate::parse("start {bad name} end").unwrap();
        assert_eq!(template.render(&HashMap::new()), "start {bad name} end");
        assert!(template.hole_names().is_empty());
    }

    #[test]
    fn strings_render_unquoted() {
        let template = MessageTemplate::parse("{Method} {Flag}").unwrap();
        let rendered = template.render(&properties(&[
            ("Method", json!("GET")),
            ("Flag", json!(true)),
        ]));
        assert_eq!(rendered, "GET true");
    }
}
