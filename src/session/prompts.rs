//! Prompt templates — opaque configuration for the phased answer flows.

/// Chain-of-thought prompt for the reasoning phase.
const COT_TEMPLATE: &str = "\
You are a careful reasoning assistant. Provide your internal chain-of-thought \
for the following question in clear, coherent paragraphs, in the same \
language as the question. Do not include the final answer — only the \
reasoning. No bullet points; only **bold** and `inline code` may be used to \
highlight keywords.\n\nQuestion: {question}\n\n\
Chain-of-thought reasoning (in paragraphs):";

/// Direct-answer prompt for the non-reasoning flow.
const DIRECT_TEMPLATE: &str = "\
Provide a direct, concise answer in proper markdown format with relevant \
emojis for: {question}\n\n{web_context}\n\nAnswer:";

/// Final-answer prompt consuming the chain of thought and optional search
/// context.
const FINAL_TEMPLATE: &str = "\
Based on the following chain-of-thought reasoning and web search context (if \
provided), generate a final, concise, and factually accurate answer in \
proper markdown format with relevant emojis.\n\n\
Chain-of-thought analysis:\n{chain_of_thought}\n\n{web_context}\n\n\
Final answer:";

pub fn chain_of_thought(question: &str) -> String {
    COT_TEMPLATE.replace("{question}", question)
}

pub fn direct(question: &str, web_context: &str) -> String {
    DIRECT_TEMPLATE
        .replace("{question}", question)
        .replace("{web_context}", web_context)
}

pub fn final_answer(chain_of_thought: &str, web_context: &str) -> String {
    FINAL_TEMPLATE
        .replace("{chain_of_thought}", chain_of_thought)
        .replace("{web_context}", web_context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_interpolate() {
        assert!(chain_of_thought("why?").contains("Question: why?"));
        assert!(direct("why?", "ctx").contains("ctx"));
        let final_prompt = final_answer("because", "snippets");
        assert!(final_prompt.contains("because"));
        assert!(final_prompt.contains("snippets"));
    }
}
