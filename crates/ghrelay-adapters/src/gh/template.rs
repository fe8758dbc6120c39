//! Argument templates and output parsing for `gh` commands

use crate::error::{Error, Result};
use serde_json::{json, Map, Value};

/// How a parameter value becomes an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Strings as-is, numbers and booleans printed, lists comma-joined
    Plain,
    /// GraphQL state enums to `gh --state`: one state lowercased, several become `all`
    State,
}

/// One element of an argument template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Text with `{key}` placeholders; every placeholder must be supplied
    Text(String),
    /// `flag value` when `key` is present, else `flag default` or nothing
    Flag {
        /// Flag, e.g. `--limit`
        flag: String,
        /// Parameter key
        key: String,
        /// Value rendering
        format: ValueFormat,
        /// Value used when the parameter is absent
        default: Option<String>,
    },
}

impl Arg {
    /// Templated text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Optional flag, omitted when the parameter is absent
    #[must_use]
    pub fn flag(flag: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Flag {
            flag: flag.into(),
            key: key.into(),
            format: ValueFormat::Plain,
            default: None,
        }
    }

    /// Optional `--state` flag
    #[must_use]
    pub fn state_flag(key: impl Into<String>) -> Self {
        Self::Flag {
            flag: "--state".to_string(),
            key: key.into(),
            format: ValueFormat::State,
            default: None,
        }
    }

    /// Flag always emitted, with a default value
    #[must_use]
    pub fn flag_or(flag: impl Into<String>, key: impl Into<String>, default: impl Into<String>) -> Self {
        Self::Flag {
            flag: flag.into(),
            key: key.into(),
            format: ValueFormat::Plain,
            default: Some(default.into()),
        }
    }
}

/// How stdout becomes envelope data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Append `--json <fields>` and parse stdout as JSON
    Json(String),
    /// stdout holds a URL: `{"url": ...}`
    Url,
    /// Success carries no payload: `{"acknowledged": true}`
    Ack,
}

/// A `gh` invocation: argument template plus output mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GhCommand {
    /// Argument template
    pub args: Vec<Arg>,
    /// Output handling
    pub output: OutputMode,
}

impl GhCommand {
    /// Create a command
    #[must_use]
    pub fn new(args: Vec<Arg>, output: OutputMode) -> Self {
        Self { args, output }
    }

    /// Render the argument list for `params`
    pub fn render(&self, params: &Map<String, Value>) -> Result<Vec<String>> {
        let mut rendered = Vec::with_capacity(self.args.len() + 2);
        for arg in &self.args {
            match arg {
                Arg::Text(text) => rendered.push(substitute(text, params)?),
                Arg::Flag {
                    flag,
                    key,
                    format,
                    default,
                } => {
                    let value = match present(params, key) {
                        Some(value) => Some(render_value(value, *format)),
                        None => default.clone(),
                    };
                    if let Some(value) = value {
                        rendered.push(flag.clone());
                        rendered.push(value);
                    }
                }
            }
        }
        if let OutputMode::Json(fields) = &self.output {
            rendered.push("--json".to_string());
            rendered.push(fields.clone());
        }
        Ok(rendered)
    }

    /// Turn successful stdout into envelope data
    pub fn parse_output(&self, stdout: &str) -> std::result::Result<Value, String> {
        match &self.output {
            OutputMode::Json(_) => serde_json::from_str(stdout)
                .map_err(|e| format!("malformed gh JSON output: {}", e)),
            OutputMode::Url => {
                let url = stdout
                    .lines()
                    .map(str::trim)
                    .rfind(|line| line.starts_with("http"))
                    .ok_or_else(|| "malformed gh output: no URL printed".to_string())?;
                Ok(json!({ "url": url }))
            }
            OutputMode::Ack => Ok(json!({ "acknowledged": true })),
        }
    }
}

fn present<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

fn substitute(template: &str, params: &Map<String, Value>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Template(format!("unterminated placeholder in '{}'", template)))?;
        let key = &after[..end];
        let value = present(params, key)
            .ok_or_else(|| Error::Template(format!("missing parameter '{}'", key)))?;
        out.push_str(&render_value(value, ValueFormat::Plain));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn render_value(value: &Value, format: ValueFormat) -> String {
    match (format, value) {
        (ValueFormat::State, Value::Array(items)) if items.len() == 1 => {
            render_value(&items[0], ValueFormat::State)
        }
        (ValueFormat::State, Value::Array(_)) => "all".to_string(),
        (ValueFormat::State, Value::String(s)) => s.to_lowercase(),
        (_, Value::String(s)) => s.clone(),
        (_, Value::Array(items)) => items
            .iter()
            .map(|v| render_value(v, ValueFormat::Plain))
            .collect::<Vec<_>>()
            .join(","),
        (_, other) => other.to_string(),
    }
}
