//! Grounded prompt construction.
//!
//! [`PromptBuilder::build`] is a pure function of its inputs: the same input
//! text and retrieval result always produce a byte-identical [`Prompt`].

use crate::document::{RetrievalResult, RetrievedPair};
use crate::error::{RagError, Result};
use crate::generation::ChatMessage;

/// Which retrieved exchanges are placed in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Only the closest exchange; the rest of the retrieval is ignored.
    #[default]
    Closest,
    /// Up to this many exchanges, closest first.
    Top(usize),
}

impl SelectionPolicy {
    fn select<'a>(&self, retrieval: &'a RetrievalResult) -> &'a [RetrievedPair] {
        let pairs = retrieval.pairs();
        let count = match self {
            SelectionPolicy::Closest => 1,
            SelectionPolicy::Top(n) => *n,
        };
        &pairs[..count.min(pairs.len())]
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
}

impl Prompt {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The chat messages sent to the generation service: one user-role message.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::user(self.text.clone())]
    }
}

/// Composes the input message and retrieved exchanges into a [`Prompt`].
///
/// The framing casts the model as a customer-service agent for `brand`
/// answering messages on `channel`, and asks for the reply text only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    brand: String,
    channel: String,
    selection: SelectionPolicy,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Amazon", "Twitter")
    }
}

impl PromptBuilder {
    pub fn new(brand: impl Into<String>, channel: impl Into<String>) -> Self {
        Self { brand: brand.into(), channel: channel.into(), selection: SelectionPolicy::Closest }
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    pub fn selection(&self) -> SelectionPolicy {
        self.selection
    }

    /// Build the prompt for `input_text` grounded on `retrieval`.
    ///
    /// Input text and retrieved exchanges are inserted verbatim.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `input_text` is empty or whitespace.
    /// - [`RagError::NoResultsAvailable`] if `retrieval` holds no exchanges.
    pub fn build(&self, input_text: &str, retrieval: &RetrievalResult) -> Result<Prompt> {
        if input_text.trim().is_empty() {
            return Err(RagError::InvalidInput("input text must not be empty".to_string()));
        }
        let selected = self.selection.select(retrieval);
        if selected.is_empty() {
            return Err(RagError::NoResultsAvailable);
        }

        let mut text = format!(
            "## CONTEXT ##\n\
             You are an AI assistant for a company called {brand}. You are in a team of \
             customer service agents that answers customers' messages on {channel}.\n\
             \n\
             ################\n\
             \n\
             ## OBJECTIVES ##\n\
             I want you to reply to a customer's message, drawing on similar conversations \
             between customers and agents. Use this step-by-step process:\n\
             \n\
             1. CUSTOMER_MESSAGE: Analyze the customer's message you have to reply to.\n\
             2. SIMILAR_EXCHANGES: Analyze the similar customer messages and the replies from our agents.\n\
             3. REPLY: Reply to [CUSTOMER_MESSAGE] using relevant information in [SIMILAR_EXCHANGES] \
             in the same style and format. If there is a link in [SIMILAR_EXCHANGES], use it in the reply.\n\
             \n\
             ################\n\
             \n\
             ## RESPONSE ##\n\
             Write the [REPLY] directly. Output only the reply text, not the analysis.\n\
             \n\
             ################\n\
             \n\
             ## DATA ##\n\
             \n\
             <CUSTOMER_MESSAGE>\n\
             {input_text}\n\
             </CUSTOMER_MESSAGE>\n\
             \n\
             <SIMILAR_EXCHANGES>\n",
            brand = self.brand,
            channel = self.channel,
        );
        for (i, pair) in selected.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str("[Customer]:\n");
            text.push_str(&pair.customer_text);
            text.push_str("\n\n[Agent]:\n");
            text.push_str(&pair.company_text);
            text.push('\n');
        }
        text.push_str("</SIMILAR_EXCHANGES>\n\n[REPLY]:");

        Ok(Prompt { text })
    }
}
