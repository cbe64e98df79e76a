use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    llm::Summarizer,
    scanner::{ToolKind, ToolResult},
};

/// Returned whenever the summarisation backend fails.
pub const FALLBACK_NARRATIVE: &str =
    "Automated analysis unavailable. Consult a cybersecurity expert.";

const SYSTEM_PROMPT: &str = "You are a cybersecurity expert.";

const PREAMBLE: &str = "Act as a cybersecurity expert. Analyze the following information, summarize the \
vulnerabilities identified, explain their implications and give detailed recommendations to mitigate them:";

/// What the model is asked to do with a piece of scan output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeTask {
    Tool(ToolKind),
    Aggregate,
}

impl NarrativeTask {
    fn instruction(self) -> &'static str {
        match self {
            Self::Tool(ToolKind::Nmap) => {
                "Analyze the following nmap output and give recommendations to improve security:"
            }
            Self::Tool(ToolKind::Nikto) => {
                "Analyze the following Nikto output, identify vulnerabilities and give recommendations:"
            }
            Self::Tool(ToolKind::Wapiti) => {
                "Interpret the following JSON report generated by Wapiti, summarize the vulnerabilities and give recommendations:"
            }
            Self::Aggregate => {
                "Analyze the following summary of results, identify the main vulnerabilities and give general recommendations to improve security:"
            }
        }
    }
}

/// Turns raw tool output into prose through an injected [`Summarizer`].
#[derive(Clone)]
pub struct NarrativeGenerator {
    summarizer: Arc<dyn Summarizer>,
    max_input_chars: usize,
}

impl NarrativeGenerator {
    pub fn new(summarizer: Arc<dyn Summarizer>, max_input_chars: usize) -> Self {
        Self {
            summarizer,
            max_input_chars,
        }
    }

    pub fn prompt(&self, task: NarrativeTask, text: &str) -> String {
        format!(
            "{PREAMBLE}\n\n{}\n{}",
            task.instruction(),
            truncate(text, self.max_input_chars)
        )
    }

    /// One backend call; any error becomes [`FALLBACK_NARRATIVE`].
    pub async fn narrate(&self, task: NarrativeTask, text: &str) -> String {
        let prompt = self.prompt(task, text);
        debug!(?task, prompt_len = prompt.len(), "requesting narrative");
        match self.summarizer.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!(?task, "summarizer returned an empty narrative");
                FALLBACK_NARRATIVE.to_string()
            }
            Err(err) => {
                warn!(?task, error = %format!("{err:#}"), "narrative generation failed");
                FALLBACK_NARRATIVE.to_string()
            }
        }
    }

    /// Narrative for a single tool. Tools that were skipped are not sent.
    pub async fn narrate_tool(&self, result: &ToolResult, ran: bool) -> String {
        if !ran {
            return format!("{} was not run for this scan type.", result.tool);
        }
        self.narrate(NarrativeTask::Tool(result.tool), &result.output)
            .await
    }

    /// Summary over every tool's output.
    pub async fn narrate_aggregate(&self, results: &[ToolResult]) -> String {
        self.narrate(NarrativeTask::Aggregate, &aggregate_text(results))
            .await
    }
}

/// Concatenate every tool's output under a heading.
pub fn aggregate_text(results: &[ToolResult]) -> String {
    let tools: Vec<_> = results.iter().map(|r| r.tool.display_name()).collect();
    let mut text = format!(
        "This is an overall summary of the scan combining the findings of {}.",
        tools.join(", ")
    );
    for result in results {
        text.push_str(&format!("\n\n{} results:\n{}", result.tool, result.output));
    }
    text
}

fn truncate(input: &str, max_chars: usize) -> String {
    if max_chars == 0 || input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSummarizer {
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
            assert_eq!(system, SYSTEM_PROMPT);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().ok_or_else(|| anyhow!("quota exceeded"))
        }
    }

    fn generator(reply: Option<&str>) -> (Arc<RecordingSummarizer>, NarrativeGenerator) {
        let summarizer = Arc::new(RecordingSummarizer {
            prompts: Mutex::default(),
            reply: reply.map(str::to_string),
        });
        let generator = NarrativeGenerator::new(summarizer.clone(), 50);
        (summarizer, generator)
    }

    #[tokio::test]
    async fn failing_backend_yields_fallback() {
        let (summarizer, generator) = generator(None);
        let narrative = generator
            .narrate(NarrativeTask::Tool(ToolKind::Nmap), "22/tcp open ssh")
            .await;
        assert_eq!(narrative, FALLBACK_NARRATIVE);
        assert_eq!(summarizer.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_reply_yields_fallback() {
        let (_, generator) = generator(Some("   "));
        let narrative = generator.narrate(NarrativeTask::Aggregate, "x").await;
        assert_eq!(narrative, FALLBACK_NARRATIVE);
    }

    #[tokio::test]
    async fn prompt_carries_instruction_and_output() {
        let (summarizer, generator) = generator(Some(" Patch OpenSSH. "));
        let result = ToolResult::success(ToolKind::Nikto, "and 3 item(s) reported");
        let narrative = generator.narrate_tool(&result, true).await;
        assert_eq!(narrative, "Patch OpenSSH.");
        let prompts = summarizer.prompts.lock().unwrap();
        assert!(prompts[0].starts_with(PREAMBLE));
        assert!(prompts[0].contains("Nikto output"));
        assert!(prompts[0].ends_with("and 3 item(s) reported"));
    }

    #[tokio::test]
    async fn skipped_tools_are_not_sent() {
        let (summarizer, generator) = generator(Some("unused"));
        let narrative = generator
            .narrate_tool(&ToolResult::not_run(ToolKind::Wapiti), false)
            .await;
        assert_eq!(narrative, "Wapiti was not run for this scan type.");
        assert!(summarizer.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn long_input_is_truncated() {
        let (summarizer, generator) = generator(Some("ok"));
        generator
            .narrate(NarrativeTask::Tool(ToolKind::Wapiti), &"a".repeat(200))
            .await;
        let prompts = summarizer.prompts.lock().unwrap();
        assert!(prompts[0].ends_with(&format!("{}…", "a".repeat(50))));
    }

    #[test]
    fn aggregate_text_lists_every_tool() {
        let results = vec![
            ToolResult::success(ToolKind::Nmap, "nmap out"),
            ToolResult::success(ToolKind::Nikto, "nikto out"),
        ];
        let text = aggregate_text(&results);
        assert!(text.contains("findings of nmap, Nikto."));
        assert!(text.contains("nmap results:\nnmap out"));
        assert!(text.contains("Nikto results:\nnikto out"));
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("abcdef", 0), "abcdef");
    }
}
