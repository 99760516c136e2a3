// SPDX-License-Identifier: MIT

//! Step catalog - static descriptors for every step kind
//!
//! Pure data: labels, typed ports, and fixed credit costs. Behavior lives
//! in `crate::steps`; the catalog is what the compiler, the cost estimator,
//! and the orchestrator consult. A catalog is built once and passed by
//! parameter so tests can substitute smaller ones.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

/// Every step kind the engine knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    LaunchSession,
    NavigateUrl,
    FillField,
    ClickElement,
    WaitForElement,
    ScrollToElement,
    GetPageHtml,
    ExtractElementText,
    HtmlToText,
    AiExtract,
    ReadJsonProperty,
    AddJsonProperty,
    DeliverWebhook,
    Delay,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::LaunchSession => "launch_session",
            StepKind::NavigateUrl => "navigate_url",
            StepKind::FillField => "fill_field",
            StepKind::ClickElement => "click_element",
            StepKind::WaitForElement => "wait_for_element",
            StepKind::ScrollToElement => "scroll_to_element",
            StepKind::GetPageHtml => "get_page_html",
            StepKind::ExtractElementText => "extract_element_text",
            StepKind::HtmlToText => "html_to_text",
            StepKind::AiExtract => "ai_extract",
            StepKind::ReadJsonProperty => "read_json_property",
            StepKind::AddJsonProperty => "add_json_property",
            StepKind::DeliverWebhook => "deliver_webhook",
            StepKind::Delay => "delay",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value type carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Json,
    /// Opaque marker for the run's single page session; the live handle
    /// only ever travels through the execution environment
    Session,
}

impl ValueType {
    /// Fallback value handed to steps reading an unset optional port
    pub fn zero(&self) -> Value {
        match self {
            ValueType::String => json!(""),
            ValueType::Number => json!(0),
            ValueType::Json | ValueType::Session => Value::Null,
        }
    }
}

/// One typed input or output port of a step
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub name: &'static str,
    pub value_type: ValueType,
    pub required: bool,
}

impl PortSpec {
    pub const fn required(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: false,
        }
    }
}

/// Static description of one step kind
#[derive(Debug, Clone)]
pub struct StepDescriptor {
    pub kind: StepKind,
    pub label: &'static str,
    /// Fixed credit cost charged when the step completes
    pub credits: u32,
    /// Entry steps may open a graph (phase 0) without any incoming edge
    pub entry: bool,
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl StepDescriptor {
    pub fn input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// Immutable-after-init registry of step descriptors
#[derive(Debug, Clone)]
pub struct Catalog {
    steps: HashMap<StepKind, StepDescriptor>,
}

impl Catalog {
    pub fn new(descriptors: Vec<StepDescriptor>) -> Self {
        let steps = descriptors.into_iter().map(|d| (d.kind, d)).collect();
        Self { steps }
    }

    /// The full standard step table
    pub fn standard() -> Self {
        Self::new(STANDARD.clone())
    }

    pub fn lookup(&self, kind: StepKind) -> Option<&StepDescriptor> {
        self.steps.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

static STANDARD: Lazy<Vec<StepDescriptor>> = Lazy::new(|| {
    use ValueType::*;

    vec![
        StepDescriptor {
            kind: StepKind::LaunchSession,
            label: "Launch session",
            credits: 5,
            entry: true,
            inputs: vec![PortSpec::required("websiteUrl", String)],
            outputs: vec![PortSpec::required("session", Session)],
        },
        StepDescriptor {
            kind: StepKind::NavigateUrl,
            label: "Navigate to URL",
            credits: 2,
            entry: false,
            inputs: vec![
                PortSpec::required("session", Session),
                PortSpec::required("url", String),
            ],
            outputs: vec![PortSpec::required("session", Session)],
        },
        StepDescriptor {
            kind: StepKind::FillField,
            label: "Fill field",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("session", Session),
                PortSpec::required("selector", String),
                PortSpec::required("value", String),
            ],
            outputs: vec![PortSpec::required("session", Session)],
        },
        StepDescriptor {
            kind: StepKind::ClickElement,
            label: "Click element",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("session", Session),
                PortSpec::required("selector", String),
            ],
            outputs: vec![PortSpec::required("session", Session)],
        },
        StepDescriptor {
            kind: StepKind::WaitForElement,
            label: "Wait for element",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("session", Session),
                PortSpec::required("selector", String),
                PortSpec::optional("visibility", String),
            ],
            outputs: vec![PortSpec::required("session", Session)],
        },
        StepDescriptor {
            kind: StepKind::ScrollToElement,
            label: "Scroll to element",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("session", Session),
                PortSpec::required("selector", String),
            ],
            outputs: vec![PortSpec::required("session", Session)],
        },
        StepDescriptor {
            kind: StepKind::GetPageHtml,
            label: "Get page HTML",
            credits: 2,
            entry: false,
            inputs: vec![PortSpec::required("session", Session)],
            outputs: vec![
                PortSpec::required("html", String),
                PortSpec::required("session", Session),
            ],
        },
        StepDescriptor {
            kind: StepKind::ExtractElementText,
            label: "Extract element text",
            credits: 2,
            entry: false,
            inputs: vec![
                PortSpec::required("session", Session),
                PortSpec::required("selector", String),
            ],
            outputs: vec![PortSpec::required("text", String)],
        },
        StepDescriptor {
            kind: StepKind::HtmlToText,
            label: "HTML to text",
            credits: 2,
            entry: false,
            inputs: vec![PortSpec::required("html", String)],
            outputs: vec![PortSpec::required("text", String)],
        },
        StepDescriptor {
            kind: StepKind::AiExtract,
            label: "Extract data with AI",
            credits: 4,
            entry: false,
            inputs: vec![
                PortSpec::required("content", String),
                PortSpec::required("prompt", String),
            ],
            outputs: vec![PortSpec::required("data", Json)],
        },
        StepDescriptor {
            kind: StepKind::ReadJsonProperty,
            label: "Read JSON property",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("json", Json),
                PortSpec::required("propertyName", String),
            ],
            outputs: vec![PortSpec::required("value", String)],
        },
        StepDescriptor {
            kind: StepKind::AddJsonProperty,
            label: "Add JSON property",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("json", Json),
                PortSpec::required("propertyName", String),
                PortSpec::required("value", String),
            ],
            outputs: vec![PortSpec::required("json", Json)],
        },
        StepDescriptor {
            kind: StepKind::DeliverWebhook,
            label: "Deliver via webhook",
            credits: 1,
            entry: false,
            inputs: vec![
                PortSpec::required("targetUrl", String),
                PortSpec::required("body", Json),
            ],
            outputs: vec![],
        },
        StepDescriptor {
            kind: StepKind::Delay,
            label: "Delay",
            credits: 1,
            entry: false,
            inputs: vec![PortSpec::required("seconds", Number)],
            outputs: vec![],
        },
    ]
});
