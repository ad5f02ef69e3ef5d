use std::collections::BTreeMap;

use serde_json::{Value as JsonValue, json};

use crate::error::{Error, Result};

use super::Term;
use super::vocab::{self, CONTEXT};

/// An active JSON-LD context, reduced to what is needed to turn compact
/// property names (`vocab:fullName`) into absolute IRIs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub vocab: Option<Term>,
    pub term_map: BTreeMap<String, Term>,
}

impl Context {
    /// Build a context from a static prefix table, as declared by node types.
    pub fn from_prefixes(prefixes: &[(&str, &str)]) -> Context {
        let mut result = Context::default();
        for (prefix, iri) in prefixes {
            result.insert(prefix, Term::new_iri(iri));
        }
        result
    }
    pub fn insert(&mut self, term: &str, definition: Term) {
        self.term_map.insert(term.to_owned(), definition);
    }
    pub fn has_term(&self, term: &str) -> bool {
        self.get_term(term).is_some()
    }
    pub fn get_term(&self, term: &str) -> Option<&Term> {
        self.term_map.get(term)
    }
    /// Layer `other` on top of this context; its definitions win.
    pub fn merge(&mut self, other: Context) {
        if other.vocab.is_some() {
            self.vocab = other.vocab;
        }
        self.term_map.extend(other.term_map);
    }

    /// Expand a property key or value IRI. Keywords and absolute IRIs are
    /// returned unchanged; `prefix:suffix` uses the prefix definition; bare
    /// terms use their definition or `@vocab`.
    pub fn expand(&self, value: &str) -> String {
        if value.starts_with('@') {
            return value.to_owned();
        }
        if let Some(definition) = self.get_term(value) {
            return definition.as_str().to_owned();
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if suffix.starts_with("//") {
                return value.to_owned();
            }
            if let Some(expanded) = self.get_term(prefix).and_then(|t| t.join(suffix)) {
                return expanded.as_str().to_owned();
            }
            return value.to_owned();
        }
        match self.vocab.as_ref().and_then(|v| v.join(value)) {
            Some(expanded) => expanded.as_str().to_owned(),
            None => value.to_owned(),
        }
    }
}

impl TryFrom<&JsonValue> for Context {
    type Error = Error;

    /// Convert a node's `@context` to an active context using the algorithm
    /// defined in https://www.w3.org/TR/json-ld11-api/#algorithm
    ///
    /// Only local contexts are processed; the KG never sends remote context
    /// references in instance payloads.
    fn try_from(value: &JsonValue) -> Result<Context> {
        let node = value
            .as_object()
            .ok_or_else(|| Error::invalid_document("value should be a JSON object"))?;
        let Some(context_def) = node.get(CONTEXT.as_str()) else {
            return Ok(Context::default());
        };
        // 4.1.2.4 Normalize context to an array
        let contexts = match context_def {
            JsonValue::Array(array) => array.to_owned(),
            other => vec![other.to_owned()],
        };

        let mut result = Context::default();
        for context in &contexts {
            match context {
                // 4.1.2.5.1 override
                JsonValue::Null => {
                    result = Context::default();
                }
                // 4.1.2.5.2
                JsonValue::String(remote_context) => {
                    return Err(Error::invalid_document(format!(
                        "remote context {remote_context} is not supported"
                    )));
                }
                // 4.1.2.5.4
                JsonValue::Object(_) => {
                    process_context_definition(context, &mut result)?;
                }
                // 4.1.2.5.3
                _ => {
                    return Err(Error::invalid_document(
                        "invalid local context (not null, string, or map)",
                    ));
                }
            }
        }

        Ok(result)
    }
}

fn process_context_definition(context: &JsonValue, result: &mut Context) -> Result<()> {
    let mut defined = BTreeMap::new();

    // 4.1.2.5.8
    match context.get("@vocab") {
        Some(JsonValue::Null) => {
            result.vocab = None;
        }
        Some(JsonValue::String(value)) => {
            result.vocab = Some(iri_expand(result, value, context, &mut defined)?);
        }
        Some(value) => {
            return Err(Error::invalid_document(format!(
                "invalid vocabulary mapping {value}"
            )));
        }
        None => {}
    }

    // 4.1.2.5.13
    let Some(entries) = context.as_object() else {
        return Ok(());
    };
    for (key, value) in entries {
        if [
            "@base",
            "@direction",
            "@import",
            "@language",
            "@propagate",
            "@protected",
            "@version",
            "@vocab",
        ]
        .contains(&key.as_str())
        {
            continue;
        }
        create_term_definition(result, context, key, value, &mut defined)?;
    }

    Ok(())
}

fn create_term_definition(
    result: &mut Context,
    context: &JsonValue,
    term: &str,
    value: &JsonValue,
    defined: &mut BTreeMap<String, bool>,
) -> Result<()> {
    // 4.2.2.1
    match defined.get(term) {
        Some(true) => return Ok(()),
        Some(false) => return Err(Error::invalid_document("cyclic IRI mapping found")),
        _ => {}
    }
    // 4.2.2.2
    if term.is_empty() {
        return Err(Error::invalid_document(
            "invalid term definition (empty string)",
        ));
    }
    defined.insert(term.to_owned(), false);

    // 4.2.2.5
    if term.starts_with('@') && term.is_ascii() {
        return Err(Error::invalid_document("keyword redefinition error"));
    }
    // 4.2.2.6
    result.term_map.remove(term);

    let value = match value {
        // 4.2.2.7
        JsonValue::Null => json!({ "@id": null }),
        // 4.2.2.8
        JsonValue::String(string) => json!({ "@id": string }),
        // 4.2.2.9
        JsonValue::Object(_) => value.clone(),
        _ => return Err(Error::invalid_document("invalid term definition error")),
    };

    let mut definition = None;
    match value.get("@id") {
        // 4.2.2.14.1
        Some(JsonValue::Null) => {}
        Some(JsonValue::String(id)) => {
            // 4.2.2.14.2.3
            let expanded = iri_expand(result, id, context, defined)?;
            if expanded == vocab::CONTEXT {
                return Err(Error::invalid_document(
                    "invalid keyword alias error (@context cannot be aliased)",
                ));
            }
            definition = Some(expanded);
        }
        // 4.2.2.14.2.1
        Some(_) => {
            return Err(Error::invalid_document(
                "invalid IRI mapping error (entry is not a string)",
            ));
        }
        None => {
            // 4.2.2.15
            if let Some((term_prefix, suffix)) = term.split_once(':') {
                if !suffix.starts_with("//") {
                    definition = result
                        .get_term(term_prefix)
                        .and_then(|t| t.join(suffix))
                        .or_else(|| Some(Term::new_iri(term)));
                }
            // 4.2.2.18
            } else if let Some(vocab) = &result.vocab {
                definition = vocab.join(term);
            }
        }
    }

    if let Some(definition) = definition {
        result.insert(term, definition);
    }
    defined.insert(term.to_owned(), true);

    Ok(())
}

fn iri_expand(
    active_context: &mut Context,
    value: &str,
    local_context: &JsonValue,
    defined: &mut BTreeMap<String, bool>,
) -> Result<Term> {
    // 5.2.2.1
    if value.starts_with('@') {
        return Ok(Term::new_keyword(value));
    }
    // 5.2.2.3
    if let Some(entry_value) = local_context.get(value) {
        if defined.get(value).is_none() {
            create_term_definition(active_context, local_context, value, entry_value, defined)?;
        }
    }
    // 5.2.2.4, 5.2.2.5
    if let Some(definition) = active_context.get_term(value) {
        return Ok(definition.clone());
    }
    if let Some((prefix, suffix)) = value.split_once(':') {
        // 5.2.2.6.2
        if suffix.starts_with("//") {
            return Ok(Term::new_iri(value));
        }
        // 5.2.2.6.3
        if let Some(prefix_value) = local_context.get(prefix) {
            if !matches!(defined.get(prefix), Some(true)) {
                create_term_definition(
                    active_context,
                    local_context,
                    prefix,
                    prefix_value,
                    defined,
                )?;
            }
        }
        // 5.2.2.6.4
        if let Some(joined) = active_context.get_term(prefix).and_then(|t| t.join(suffix)) {
            return Ok(joined);
        }
        // 5.2.2.6.5
        return Ok(Term::new_iri(value));
    }
    // 5.2.2.7
    if let Some(joined) = active_context.vocab.as_ref().and_then(|v| v.join(value)) {
        return Ok(joined);
    }

    Ok(Term::new_iri(value))
}
