//! Station domain model

use crate::gateway::ModelId;
use crate::protocol::{list_item, HEADER, LIST_ITEM};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Placeholders a station prompt may reference
pub const KNOWN_PLACEHOLDERS: [&str; 4] = ["text", "previous", "metadata", "station_name"];

/// One immutable stage of the analysis pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct StationDefinition {
    /// Position in the pipeline, 1..=7
    pub id: u8,

    /// Arabic display name
    pub name: String,

    /// The base prompt template for this station
    pub prompt_template: String,

    /// Section titles the answer is expected to contain
    pub expected_output_shape: Vec<String>,

    /// Primary model
    pub model: ModelId,

    /// Model tried once if the primary call fails
    pub fallback_model: Option<ModelId>,

    pub temperature: f32,

    /// Characters of the original text substituted for `{{ text }}`
    pub text_char_limit: usize,

    /// Characters of prior station output substituted for `{{ previous }}`
    pub previous_char_limit: usize,

    /// Timeout in seconds for the whole station, fallback included
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StationDefaults {
    pub temperature: f32,
    pub timeout_secs: u64,
    pub fallback_model: Option<ModelId>,
    pub text_char_limit: usize,
    pub previous_char_limit: usize,
}

impl Default for StationDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            timeout_secs: 300, // 5 minutes
            fallback_model: None,
            text_char_limit: 30_000,
            previous_char_limit: 40_000,
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Names of all `{{ name }}` placeholders in a template
pub fn placeholders(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// First `limit` characters of `text`, cut on a character boundary
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

impl StationDefinition {
    /// Render the prompt with variable substitution. Unknown placeholders
    /// are left untouched.
    pub fn render_prompt(&self, variables: &HashMap<String, String>) -> String {
        placeholder_regex()
            .replace_all(&self.prompt_template, |caps: &Captures| {
                let name = &caps[1];
                match variables.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Build the effective prompt with the user notes and the output-shape instructions
    pub fn build_effective_prompt(
        &self,
        variables: &HashMap<String, String>,
        metadata: Option<&str>,
    ) -> String {
        let mut prompt = self.render_prompt(variables);

        if let Some(notes) = metadata.filter(|m| !m.trim().is_empty()) {
            if !self.prompt_template.contains("metadata") {
                prompt.push_str("\n\nملاحظات المستخدم:\n");
                prompt.push_str(notes.trim());
            }
        }

        prompt.push_str("\n\nتعليمات الإخراج:\n");
        prompt.push_str("اكتب نصاً عربياً عادياً فقط، بدون JSON وبدون كتل برمجية.\n");
        prompt.push_str(&format!(
            "ابدأ كل قسم بعنوان على الصورة: {} العنوان {}\n",
            HEADER, HEADER
        ));
        prompt.push_str(&format!(
            "استخدم {} للقوائم النقطية، و 1. للقوائم المرقمة، و المفتاح: القيمة للبيانات القصيرة.\n",
            LIST_ITEM
        ));

        if !self.expected_output_shape.is_empty() {
            prompt.push_str("يجب أن يتضمن الرد الأقسام التالية:\n");
            for section in &self.expected_output_shape {
                prompt.push_str(&list_item(section));
                prompt.push('\n');
            }
        }

        prompt
    }

    /// Whether the station consumes earlier station outputs
    pub fn uses_previous(&self) -> bool {
        placeholders(&self.prompt_template)
            .iter()
            .any(|p| p == "previous")
    }
}
