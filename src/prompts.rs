//! Prompt builders for the three LLM interactions: query generation,
//! summarization, and reflection. Each variant exists in a tool-calling and a
//! JSON-mode flavor.

use crate::clients::ChatMessage;
use crate::config::StructuredOutputMode;

pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

const QUERY_WRITER_INSTRUCTIONS: &str = "Your goal is to generate a targeted web search query.

<CONTEXT>
Current date: {current_date}
Please ensure your queries account for the most current information available as of this date.
</CONTEXT>

<TOPIC>
{research_topic}
</TOPIC>";

const JSON_MODE_QUERY_INSTRUCTIONS: &str = "<FORMAT>
Format your response as a JSON object with these exact keys:
- query: The actual search query string
- rationale: Brief explanation of why this query is relevant
</FORMAT>

<EXAMPLE>
Example output:
{
    \"query\": \"machine learning transformer architecture explained\",
    \"rationale\": \"Understanding the fundamental structure of transformer models\"
}
</EXAMPLE>

Provide your response in JSON format:";

const TOOL_CALLING_QUERY_INSTRUCTIONS: &str = "<INSTRUCTIONS>
Call the Query tool to format your response with the following keys:
- query: The actual search query string
- rationale: Brief explanation of why this query is relevant
</INSTRUCTIONS>

Call the Query tool to generate a query for web search:";

const SUMMARIZER_INSTRUCTIONS: &str = "You are a research assistant producing a running summary of web research.

<GOAL>
Generate a high-quality summary of the provided context, extending any
existing summary with new information rather than repeating it.
</GOAL>

<REQUIREMENTS>
- Integrate new information with what is already summarized
- Keep the summary factual and tied to the sources
- Write in clear, professional prose without URLs or citations
- Start directly with the updated summary, without preamble or meta-commentary
</REQUIREMENTS>";

const REFLECTION_INSTRUCTIONS: &str = "You are an expert research assistant analyzing a summary about {research_topic}.

<GOAL>
1. Identify knowledge gaps or areas that need deeper exploration
2. Generate a follow-up question that would help expand your understanding
3. Focus on technical details, implementation specifics, or emerging trends that were not fully covered
</GOAL>

<SUMMARY>
{running_summary}
</SUMMARY>";

const JSON_MODE_REFLECTION_INSTRUCTIONS: &str = "<FORMAT>
Format your response as a JSON object with these exact keys:
- knowledge_gap: Describe what information is missing or needs clarification
- follow_up_query: Write a specific question to address this gap
</FORMAT>

<Task>
Reflect carefully on the Summary to identify knowledge gaps and produce a follow-up query. Then, produce your output following this JSON format:
{
    \"knowledge_gap\": \"The summary lacks information about performance metrics and benchmarks\",
    \"follow_up_query\": \"What are typical performance benchmarks and metrics used to evaluate [specific technology]?\"
}
</Task>

Provide your analysis in JSON format:";

const TOOL_CALLING_REFLECTION_INSTRUCTIONS: &str = "<INSTRUCTIONS>
Call the FollowUpQuery tool to format your response with the following keys:
- follow_up_query: Write a specific question to address this gap
- knowledge_gap: Describe what information is missing or needs clarification
</INSTRUCTIONS>

<Task>
Reflect carefully on the Summary to identify knowledge gaps and produce a follow-up query.
</Task>

Call the FollowUpQuery Tool to generate a reflection for this request:";

/// Messages for the initial search query generation, seeded with the topic
/// and current date.
pub fn query_generation_messages(topic: &str, mode: StructuredOutputMode) -> Vec<ChatMessage> {
    let instructions = QUERY_WRITER_INSTRUCTIONS
        .replace("{current_date}", &current_date())
        .replace("{research_topic}", topic);
    let format_instructions = match mode {
        StructuredOutputMode::ToolCall => TOOL_CALLING_QUERY_INSTRUCTIONS,
        StructuredOutputMode::JsonText => JSON_MODE_QUERY_INSTRUCTIONS,
    };
    vec![
        ChatMessage::system(format!("{instructions}\n\n{format_instructions}")),
        ChatMessage::user("Generate a query for web search:"),
    ]
}

/// Messages for the running-summary update from the latest research results.
pub fn summarize_messages(
    topic: &str,
    existing_summary: &str,
    new_context: &str,
) -> Vec<ChatMessage> {
    let human = if existing_summary.is_empty() {
        format!(
            "<Context> \n {new_context} \n <Context>\
             Create a Summary using the Context on this topic: \n <User Input> \n {topic} \n <User Input>\n\n"
        )
    } else {
        format!(
            "<Existing Summary> \n {existing_summary} \n <Existing Summary>\n\n\
             <New Context> \n {new_context} \n <New Context>\
             Update the Existing Summary with the New Context on this topic: \n <User Input> \n {topic} \n <User Input>\n\n"
        )
    };
    vec![ChatMessage::system(SUMMARIZER_INSTRUCTIONS), ChatMessage::user(human)]
}

/// Messages for the reflection step that produces the follow-up query.
pub fn reflection_messages(
    topic: &str,
    running_summary: &str,
    mode: StructuredOutputMode,
) -> Vec<ChatMessage> {
    let instructions = REFLECTION_INSTRUCTIONS
        .replace("{research_topic}", topic)
        .replace("{running_summary}", running_summary);
    let format_instructions = match mode {
        StructuredOutputMode::ToolCall => TOOL_CALLING_REFLECTION_INSTRUCTIONS,
        StructuredOutputMode::JsonText => JSON_MODE_REFLECTION_INSTRUCTIONS,
    };
    vec![
        ChatMessage::system(format!("{instructions}\n\n{format_instructions}")),
        ChatMessage::user(format!(
            "Reflect on our existing knowledge about {topic} and identify a knowledge gap:"
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Role;

    #[test]
    fn query_messages_carry_topic_and_date() {
        let messages =
            query_generation_messages("quantum computing", StructuredOutputMode::JsonText);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("quantum computing"));
        assert!(messages[0].content.contains(&current_date()));
        assert!(messages[0].content.contains("JSON"));
    }

    #[test]
    fn summarize_messages_switch_on_existing_summary() {
        let fresh = summarize_messages("topic", "", "ctx");
        assert!(fresh[1].content.contains("Create a Summary"));
        let update = summarize_messages("topic", "so far", "ctx");
        assert!(update[1].content.contains("Update the Existing Summary"));
        assert!(update[1].content.contains("so far"));
    }

    #[test]
    fn reflection_messages_embed_summary() {
        let messages =
            reflection_messages("rust", "what we know", StructuredOutputMode::ToolCall);
        assert!(messages[0].content.contains("what we know"));
        assert!(messages[0].content.contains("FollowUpQuery"));
    }
}
