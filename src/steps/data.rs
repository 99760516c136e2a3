// SPDX-License-Identifier: MIT

//! Pure data steps: text extraction and JSON shaping
//!
//! None of these touch anything outside the environment.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::error::Error;

use super::StepHandler;
use crate::catalog::StepKind;
use crate::run::Environment;

static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("hardcoded regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("hardcoded regex"));
static BLANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("hardcoded regex"));

/// Basic HTML tag stripping
pub fn strip_html_tags(html: &str) -> String {
    let cleaned = BLOCK_RE.replace_all(html, "");
    let text = TAG_RE.replace_all(&cleaned, "");

    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    let text = BLANK_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Strips an HTML string down to its readable text
pub struct HtmlToText;

#[async_trait]
impl StepHandler for HtmlToText {
    fn kind(&self) -> StepKind {
        StepKind::HtmlToText
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let html = env.string_input("html");
        if html.is_empty() {
            return Err("html input is empty".into());
        }

        let text = strip_html_tags(&html);
        env.log_info(format!("stripped to {} chars", text.len()));
        env.set_output("text", json!(text));
        Ok(())
    }
}

/// Reads a dot-path property out of a JSON value as a string
pub struct ReadJsonProperty;

#[async_trait]
impl StepHandler for ReadJsonProperty {
    fn kind(&self) -> StepKind {
        StepKind::ReadJsonProperty
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let property = env.string_input("propertyName");
        if property.is_empty() {
            return Err("propertyName input is empty".into());
        }
        let json = env.json_input("json");

        let value = extract_json_path(&json, &property)
            .ok_or_else(|| format!("property '{property}' not found"))?;
        let text = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };

        env.set_output("value", json!(text));
        Ok(())
    }
}

/// Sets one property on a JSON object; a null input starts a fresh object
pub struct AddJsonProperty;

#[async_trait]
impl StepHandler for AddJsonProperty {
    fn kind(&self) -> StepKind {
        StepKind::AddJsonProperty
    }

    async fn try_run(&self, env: &mut Environment) -> Result<(), Box<dyn Error + Send + Sync>> {
        let property = env.string_input("propertyName");
        if property.is_empty() {
            return Err("propertyName input is empty".into());
        }
        let value = env.string_input("value");

        let mut object = match env.json_input("json") {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(format!("json input is not an object: {other}").into()),
        };
        object.insert(property, json!(value));

        env.set_output("json", Value::Object(object));
        Ok(())
    }
}

/// Extract a value from JSON using a simple dot-notation path
fn extract_json_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current.clone())
}
