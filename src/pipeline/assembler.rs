//! Context Assembler
//!
//! Packs ranked documents into a single text blob that never exceeds the
//! configured token budget. Documents are considered strictly in rank
//! order; the first document that would push the running total over budget
//! stops iteration, so the included set is always a prefix of the input and
//! no document is ever partially included.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::pipeline::fusion::FusedDocument;
use crate::pipeline::tokenizer::CountTokens;

/// Default separator placed between included documents.
pub const DEFAULT_SEPARATOR: &str = "\n\n---\n\n";

/// Configuration for context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextAssemblerConfig {
    /// Maximum token count for the assembled context, separators included.
    pub token_budget: usize,
    /// Separator inserted between documents (not before the first).
    pub separator: String,
}

impl Default for ContextAssemblerConfig {
    fn default() -> Self {
        Self {
            token_budget: 2_048,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// The assembled context plus how many input documents made it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// Documents' texts joined by the separator; empty for empty input.
    pub text: String,
    /// How many documents from the front of the input were included.
    pub included: usize,
}

/// Budget-aware context assembler.
pub struct ContextAssembler {
    counter: Arc<dyn CountTokens>,
    config: ContextAssemblerConfig,
}

impl ContextAssembler {
    /// Create an assembler over the given token counter.
    pub fn new(counter: Arc<dyn CountTokens>, config: ContextAssemblerConfig) -> Self {
        Self { counter, config }
    }

    /// The configured token budget.
    pub fn token_budget(&self) -> usize {
        self.config.token_budget
    }

    /// Assemble fused documents in the given order.
    pub fn assemble(&self, documents: &[FusedDocument]) -> AssembledContext {
        self.assemble_texts(documents.iter().map(|d| d.document.text.as_str()))
    }

    /// Assemble raw texts in the given order.
    pub fn assemble_texts<'a>(
        &self,
        texts: impl IntoIterator<Item = &'a str>,
    ) -> AssembledContext {
        let separator_tokens = self.counter.count_tokens(&self.config.separator);

        let mut included: Vec<&str> = Vec::new();
        let mut running = 0usize;

        for text in texts {
            let item_tokens = self.counter.count_tokens(text);
            let separator_cost = if included.is_empty() {
                0
            } else {
                separator_tokens
            };
            if running + separator_cost + item_tokens > self.config.token_budget {
                // Rank order beats packing efficiency: everything after the
                // first rejection is excluded even if it would fit.
                break;
            }
            running += separator_cost + item_tokens;
            included.push(text);
        }

        AssembledContext {
            text: included.join(&self.config.separator),
            included: included.len(),
        }
    }
}
