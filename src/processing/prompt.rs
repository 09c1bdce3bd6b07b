//! Prompt assembly for grounded answers.

/// Number of chunks retrieved for every question.
pub const RETRIEVAL_LIMIT: usize = 3;

/// Join retrieved chunk texts into a single context block separated by blank lines.
pub(crate) fn build_context<'a>(chunks: impl IntoIterator<Item = &'a str>) -> String {
    chunks.into_iter().collect::<Vec<_>>().join("\n\n")
}

/// Substitute context and question into the fixed answer template.
pub(crate) fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant answering questions based on the provided document.\n\
         Context:\n\
         {context}\n\
         Question:\n\
         {question}\n\
         Answer in concise bullet points."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_joins_with_blank_lines() {
        let context = build_context(["first", "second", "third"]);
        assert_eq!(context, "first\n\nsecond\n\nthird");
    }

    #[test]
    fn empty_retrieval_gives_empty_context() {
        assert_eq!(build_context(std::iter::empty()), "");
    }

    #[test]
    fn prompt_places_context_before_question() {
        let prompt = build_prompt("Worked at Acme.", "Where did they work?");
        let context_at = prompt.find("Worked at Acme.").expect("context present");
        let question_at = prompt.find("Where did they work?").expect("question present");
        assert!(context_at < question_at);
        assert!(prompt.starts_with("You are a helpful assistant"));
        assert!(prompt.ends_with("Answer in concise bullet points."));
        assert!(prompt.contains("Context:\nWorked at Acme.\nQuestion:\n"));
    }
}
