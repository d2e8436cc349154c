//! Text sanitation applied to everything the conversation stores or sends.

/// Remove every single-quote character.
pub fn strip_quotes(text: &str) -> String {
    text.replace('\'', "")
}
