//! Fixed prompts and prompt assembly for the chat flow

use azrag_core::ContextItem;

/// System turn for rewriting a question into a search query
pub const QUERY_TRANSLATION_PROMPT: &str = "
You are an AI assistant tasked with translating user queries into effective search queries. 
Your goal is to create a search query that will retrieve the most relevant documents from a search index.
Analyze the user's input and generate a concise, relevant search query.
";

/// System turn restricting answers to the supplied context
pub const RAG_SYSTEM_PROMPT: &str = "
You are a helpful AI assistant. You are given a user input and some context, it is your job to answer the question based on the context. 
You can use the context to generate a response that is relevant and informative. The context may not always be relevant to the user input, you should use your best judgment to determine the most appropriate response.
Do not provide answers that are not included in the context. Your goal is to provide accurate and helpful responses based on the information provided only.
";

/// `filename: content` lines, in retrieval order
pub fn format_context(items: &[ContextItem]) -> String {
    items
        .iter()
        .map(|item| format!("{}: {}", item.filename, item.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User turn carrying the context block and the original question
pub fn build_user_input(context_text: &str, user_input: &str) -> String {
    format!("Context: {}\n\nUser Input: {}", context_text, user_input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_formatting() {
        let items = vec![
            ContextItem {
                filename: "benefits.pdf".to_string(),
                content: "Your healthcare plan costs $100 per month.".to_string(),
            },
            ContextItem {
                filename: "handbook.pdf".to_string(),
                content: "Dress code is business casual.".to_string(),
            },
        ];

        assert_eq!(
            format_context(&items),
            "benefits.pdf: Your healthcare plan costs $100 per month.\nhandbook.pdf: Dress code is business casual."
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_user_input_layout() {
        assert_eq!(
            build_user_input("a.pdf: x", "what is x?"),
            "Context: a.pdf: x\n\nUser Input: what is x?"
        );
    }
}
