//! Prompt builder for rendering templates.
//!
//! Values are inserted verbatim (no HTML escaping), so the rendered text
//! always carries the literal question, history and context.

use crate::types::{BuiltPrompt, PromptDefinition};
use docchat_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Inputs of the grounded answer prompt.
#[derive(Debug, Clone, Default)]
pub struct AnswerInputs<'a> {
    /// Rendered history block; empty when history is off or absent
    pub chat_history: &'a str,
    /// Concatenated retrieved chunks
    pub context: &'a str,
    /// The user's question
    pub question: &'a str,
    /// Language the assistant must answer in
    pub language: &'a str,
}

/// Build a prompt from a definition and input variables.
///
/// # Example
/// ```no_run
/// use docchat_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is the refund policy?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.text);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        rendered,
        definition.id.clone(),
        variables,
    ))
}

/// Build the grounded answer prompt.
pub fn build_answer_prompt(
    definition: &PromptDefinition,
    inputs: &AnswerInputs<'_>,
) -> AppResult<BuiltPrompt> {
    let mut variables = HashMap::new();
    variables.insert("chatHistory".to_string(), inputs.chat_history.to_string());
    variables.insert("context".to_string(), inputs.context.to_string());
    variables.insert("question".to_string(), inputs.question.to_string());
    variables.insert("language".to_string(), inputs.language.to_string());

    build_prompt(definition, variables)
}

/// Build the prompt that folds chat history into a standalone retrieval query.
pub fn build_summary_prompt(
    definition: &PromptDefinition,
    chat_history: &str,
    question: &str,
) -> AppResult<BuiltPrompt> {
    let mut variables = HashMap::new();
    variables.insert("chatHistory".to_string(), chat_history.to_string());
    variables.insert("question".to_string(), question.to_string());

    build_prompt(definition, variables)
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{builtin_prompt, ANSWER_PROMPT_ID, SUMMARY_PROMPT_ID};

    fn block<'a>(text: &'a str, tag: &str) -> &'a str {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);
        let start = text.rfind(&open).unwrap() + open.len();
        let end = text.rfind(&close).unwrap();
        &text[start..end]
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "a < b & \"c\"".to_string());

        let result = render_template("{{question}}", &vars).unwrap();
        assert_eq!(result, "a < b & \"c\"");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars);
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_answer_prompt_places_question_in_question_block() {
        let def = builtin_prompt(ANSWER_PROMPT_ID).unwrap();
        let question = "What is the {{refund}} policy? <b>now</b>";
        let built = build_answer_prompt(
            &def,
            &AnswerInputs {
                chat_history: "",
                context: "Refunds are issued within 30 days.",
                question,
                language: "English",
            },
        )
        .unwrap();

        assert!(block(&built.text, "question").contains(question));
        assert!(block(&built.text, "context").contains("within 30 days"));
        assert!(block(&built.text, "chat_history").trim().is_empty());
        assert!(built.text.contains("Answer in English."));
        assert_eq!(built.metadata.source_prompt_id, ANSWER_PROMPT_ID);
    }

    #[test]
    fn test_summary_prompt_carries_history_and_question() {
        let def = builtin_prompt(SUMMARY_PROMPT_ID).unwrap();
        let built = build_summary_prompt(
            &def,
            "user: Do you ship to Chile?\nassistant: Yes.",
            "How long does it take?",
        )
        .unwrap();

        assert!(block(&built.text, "chat_history").contains("ship to Chile"));
        assert!(block(&built.text, "question").contains("How long does it take?"));
    }
}
