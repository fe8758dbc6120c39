//! Alias compilation and document merging

use crate::error::{Error, Result};
use crate::registry::OperationKind;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("VARIABLE_REGEX is a compile-time constant")
});

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("NAME_REGEX is a compile-time constant")
});

/// Name of the merged operation
pub const BATCH_OPERATION_NAME: &str = "GhrelayBatch";

/// Alias for the step at chain index `index`
#[must_use]
pub fn alias_for(index: usize) -> String {
    format!("step{}", index)
}

/// One document rewritten under an alias
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    /// Alias of the root field
    pub alias: String,
    /// Renamed variable definitions, e.g. `$step0_owner: String!`
    pub definitions: Vec<String>,
    /// Aliased root field selection
    pub selection: String,
    /// Renamed variables taken from the step input
    pub variables: Map<String, Value>,
}

/// Merged batch document
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDocument {
    /// Full operation text
    pub query: String,
    /// Variables for every step
    pub variables: Value,
}

/// Rewrite a single-root-field document of the given `kind` under `alias`.
///
/// Variable values are looked up in `inputs` by their declared name; absent
/// or null inputs are left out so document defaults apply.
pub fn compile_step(
    alias: &str,
    document: &str,
    kind: OperationKind,
    inputs: &Map<String, Value>,
) -> Result<CompiledStep> {
    let open = document
        .find('{')
        .ok_or_else(|| Error::Document("document has no selection set".to_string()))?;
    let close = document
        .rfind('}')
        .filter(|close| *close > open)
        .ok_or_else(|| Error::Document("unbalanced selection set".to_string()))?;

    let header = &document[..open];
    let body = document[open + 1..close].trim();
    if body.is_empty() {
        return Err(Error::Document("empty selection set".to_string()));
    }

    let keyword = header.split_whitespace().next().unwrap_or_default();
    let keyword = keyword.split('(').next().unwrap_or_default();
    let found = match keyword {
        "query" => OperationKind::Query,
        "mutation" => OperationKind::Mutation,
        other => {
            return Err(Error::Document(format!(
                "expected a query or mutation, found '{}'",
                other
            )))
        }
    };
    if found != kind {
        return Err(Error::Document(format!(
            "expected a {} document, found a {}",
            keyword_of(kind),
            keyword
        )));
    }

    let roots = root_field_count(body);
    if roots != 1 {
        return Err(Error::Document(format!(
            "expected exactly one root field, found {}",
            roots
        )));
    }

    let mut definitions = Vec::new();
    let mut variables = Map::new();
    if let Some(start) = header.find('(') {
        let end = header
            .rfind(')')
            .filter(|end| *end > start)
            .ok_or_else(|| Error::Document("unterminated variable definitions".to_string()))?;

        for raw in header[start + 1..end].split('$') {
            let definition = raw.trim().trim_end_matches(',').trim();
            if definition.is_empty() {
                continue;
            }
            let name = definition.split(':').next().unwrap_or_default().trim();
            if !NAME_REGEX.is_match(name) || !definition.contains(':') {
                return Err(Error::Document(format!(
                    "invalid variable definition '${}'",
                    definition
                )));
            }

            definitions.push(format!("${}_{}", alias, definition));
            if let Some(value) = inputs.get(name).filter(|v| !v.is_null()) {
                variables.insert(format!("{}_{}", alias, name), value.clone());
            }
        }
    }

    let renamed = VARIABLE_REGEX.replace_all(body, |caps: &Captures<'_>| {
        format!("${}_{}", alias, &caps[1])
    });

    Ok(CompiledStep {
        alias: alias.to_string(),
        definitions,
        selection: format!("{}: {}", alias, renamed),
        variables,
    })
}

fn keyword_of(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Query => "query",
        OperationKind::Mutation => "mutation",
    }
}

/// Count top-level fields of a selection body. Nested selections, arguments
/// and string literals are skipped.
fn root_field_count(body: &str) -> usize {
    let mut count = 0;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    // Last significant top-level character, and whether whitespace followed it
    let mut previous: Option<char> = None;
    let mut gap = false;

    for c in body.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '(' => depth += 1,
            '}' | ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    previous = Some(c);
                    gap = false;
                }
            }
            _ if depth > 0 => {}
            c if c.is_whitespace() || c == ',' => gap = true,
            c => {
                let starts_name = c.is_ascii_alphabetic() || c == '_';
                let boundary = match previous {
                    None | Some('}') | Some(')') => true,
                    Some(p) => gap && (p.is_ascii_alphanumeric() || p == '_'),
                };
                if starts_name && boundary {
                    count += 1;
                }
                previous = Some(c);
                gap = false;
            }
        }
    }
    count
}

/// Merge compiled steps into one operation
#[must_use]
pub fn merge(kind: OperationKind, steps: &[CompiledStep]) -> BatchDocument {
    let keyword = keyword_of(kind);

    let definitions: Vec<&str> = steps
        .iter()
        .flat_map(|s| s.definitions.iter().map(String::as_str))
        .collect();
    let header = if definitions.is_empty() {
        format!("{} {}", keyword, BATCH_OPERATION_NAME)
    } else {
        format!("{} {}({})", keyword, BATCH_OPERATION_NAME, definitions.join(", "))
    };

    let selections: Vec<String> = steps
        .iter()
        .map(|s| format!("  {}", s.selection))
        .collect();

    let mut variables = Map::new();
    for step in steps {
        variables.extend(step.variables.clone());
    }

    BatchDocument {
        query: format!("{} {{\n{}\n}}", header, selections.join("\n")),
        variables: Value::Object(variables),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::documents;
    use serde_json::json;

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_compile_renames_variables() {
        let step = compile_step(
            "step0",
            documents::REPO_VIEW,
            OperationKind::Query,
            &input(json!({"owner": "octo", "name": "hello"})),
        )
        .unwrap();

        assert_eq!(
            step.definitions,
            vec!["$step0_owner: String!", "$step0_name: String!"]
        );
        assert!(step.selection.starts_with("step0: repository(owner: $step0_owner, name: $step0_name)"));
        assert!(!step.selection.contains("$owner"));
        assert_eq!(step.variables["step0_owner"], json!("octo"));
        assert_eq!(step.variables["step0_name"], json!("hello"));
    }

    #[test]
    fn test_compile_keeps_defaults_and_skips_absent() {
        let step = compile_step(
            "step3",
            documents::ISSUE_LIST,
            OperationKind::Query,
            &input(json!({"owner": "o", "name": "n", "first": null})),
        )
        .unwrap();

        assert!(step
            .definitions
            .contains(&"$step3_first: Int = 30".to_string()));
        assert!(step
            .definitions
            .contains(&"$step3_states: [IssueState!]".to_string()));
        assert!(!step.variables.contains_key("step3_first"));
        assert!(!step.variables.contains_key("step3_states"));
        assert!(step.selection.contains("first: $step3_first"));
    }

    #[test]
    fn test_compile_rejects_bad_documents() {
        let empty = Map::new();
        let query = OperationKind::Query;
        assert!(compile_step("step0", "query Nothing", query, &empty).is_err());
        assert!(compile_step("step0", "query Empty { }", query, &empty).is_err());
        assert!(compile_step("step0", "subscription S { a }", query, &empty).is_err());
        assert!(compile_step("step0", "query Bad($: Int) { a }", query, &empty).is_err());
    }

    #[test]
    fn test_compile_rejects_multiple_root_fields() {
        let document = "query Two($login: String!) {\n  viewer { login }\n  user(login: $login) { id }\n}";
        let err = compile_step("step0", document, OperationKind::Query, &Map::new()).unwrap_err();
        assert!(matches!(err, Error::Document(_)));
        assert!(err.to_string().contains("found 2"));

        let err = compile_step("step0", "query Bare { viewer rateLimit }", OperationKind::Query, &Map::new())
            .unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_root_field_count() {
        assert_eq!(root_field_count("viewer { login }"), 1);
        assert_eq!(root_field_count("viewer"), 1);
        assert_eq!(root_field_count("me: viewer { login name }"), 1);
        assert_eq!(
            root_field_count(r#"search(query: "a } b", type: REPOSITORY) @include(if: $x) { nodes { id } }"#),
            1
        );
        assert_eq!(root_field_count("a { id } b { id }"), 2);
        assert_eq!(root_field_count("a(x: 1)\nb"), 2);
    }

    #[test]
    fn test_compile_rejects_kind_mismatch() {
        let err = compile_step(
            "step0",
            documents::ISSUE_CLOSE,
            OperationKind::Query,
            &input(json!({"issueId": "I_1"})),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Document(_)));
        assert!(err.to_string().contains("expected a query document"));

        assert!(compile_step(
            "step0",
            documents::REPO_VIEW,
            OperationKind::Mutation,
            &input(json!({"owner": "o", "name": "n"})),
        )
        .is_err());
    }

    #[test]
    fn test_builtin_documents_compile() {
        let registry = crate::registry::CapabilityRegistry::builtin();
        for card in registry.list() {
            let Some(graphql) = &card.graphql else { continue };
            compile_step("step0", &graphql.document, graphql.kind, &Map::new())
                .unwrap_or_else(|e| panic!("{}: {}", card.task, e));
            if let Some(resolution) = &graphql.resolution {
                compile_step("step0", &resolution.lookup.document, OperationKind::Query, &Map::new())
                    .unwrap_or_else(|e| panic!("{} lookup: {}", card.task, e));
            }
        }
    }

    #[test]
    fn test_merge_two_steps() {
        let first = compile_step(
            "step0",
            documents::REPO_VIEW,
            OperationKind::Query,
            &input(json!({"owner": "a", "name": "b"})),
        )
        .unwrap();
        let second = compile_step(
            "step1",
            documents::REPO_VIEW,
            OperationKind::Query,
            &input(json!({"owner": "c", "name": "d"})),
        )
        .unwrap();

        let merged = merge(OperationKind::Query, &[first, second]);
        assert!(merged.query.starts_with("query GhrelayBatch($step0_owner: String!, $step0_name: String!, $step1_owner"));
        assert!(merged.query.contains("\n  step0: repository("));
        assert!(merged.query.contains("\n  step1: repository("));
        assert_eq!(merged.variables["step1_owner"], json!("c"));
        assert_eq!(merged.variables.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_merge_without_variables() {
        let step = compile_step(
            "step0",
            "mutation Touch { viewer { login } }",
            OperationKind::Mutation,
            &Map::new(),
        )
        .unwrap();
        let merged = merge(OperationKind::Mutation, &[step]);
        assert_eq!(
            merged.query,
            "mutation GhrelayBatch {\n  step0: viewer { login }\n}"
        );
        assert_eq!(merged.variables, json!({}));
    }
}
