//! Prompt Builder
//!
//! Renders the final instruction text from a template fixed at
//! construction, the assembled context, and the question. Pure
//! substitution; where the template comes from (resource file, settings) is
//! the embedding application's concern.

use ragline_core::error::{CoreError, CoreResult};

/// Placeholder for the assembled context block.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Placeholder for the user's question.
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Default answer-generation template.
pub const DEFAULT_TEMPLATE: &str = r#"Answer the question using only the context below. If the context does not contain the answer, say so instead of guessing.

Context:
{context}

Question: {question}

Answer:"#;

/// Template-based prompt builder.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    /// Create a builder from a template.
    ///
    /// The template must contain both the `{context}` and `{question}`
    /// placeholders.
    pub fn new(template: impl Into<String>) -> CoreResult<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(CoreError::validation(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    /// Render the prompt for a context block and question.
    pub fn build(&self, context: &str, question: &str) -> String {
        self.template
            .replace(CONTEXT_PLACEHOLDER, context)
            .replace(QUESTION_PLACEHOLDER, question)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
