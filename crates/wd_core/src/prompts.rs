use crate::types::GenerationTask;

pub const DEFAULT_CONTEXT: &str = "The following text is from a Destin, Florida City Council meeting.";

/// A fully formed prompt plus the generation parameters for its task.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest<'a> {
    pub task: GenerationTask,
    /// The segment the prompt was built from, verbatim.
    pub segment: &'a str,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationTask {
    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Summarize => 300,
            Self::ComplianceAnalyze => 500,
            Self::DraftPosts => 150,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Self::Summarize | Self::ComplianceAnalyze => 0.7,
            Self::DraftPosts => 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    context: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT)
    }
}

impl PromptBuilder {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn build<'a>(&self, task: GenerationTask, segment: &'a str) -> GenerationRequest<'a> {
        let prompt = match task {
            GenerationTask::Summarize => self.summarize(segment),
            GenerationTask::ComplianceAnalyze => self.compliance(segment),
            GenerationTask::DraftPosts => self.draft_posts(segment),
        };

        GenerationRequest {
            task,
            segment,
            prompt,
            max_tokens: task.max_tokens(),
            temperature: task.temperature(),
        }
    }

    fn summarize(&self, segment: &str) -> String {
        format!(
            "{} Please summarize the text into comprehensive bullet points:\n\n{}\n\nSummary in bullet points:",
            self.context, segment
        )
    }

    fn compliance(&self, segment: &str) -> String {
        format!(
            "{} Please analyze the text and identify any legal or ethical violations. \
             Report only the following:\n\
             - Specific laws, regulations, or ethical standards violated.\n\
             - Detailed descriptions of the violations.\n\
             - Any content that raises potential legal or ethical concerns.\n\n\
             Here is the text to analyze:\n\n{}\n\n\
             Provide a concise report listing all identified violations or concerns.",
            self.context, segment
        )
    }

    fn draft_posts(&self, segment: &str) -> String {
        format!(
            "{} Based on this content, create simple, dry, short posts for Nextdoor:\n\n{}\n\n\
             Each post should:\n\
             - Be direct and concise.\n\
             - Use friendly and relatable language.\n\
             - Reaffirm that the information is sourced from city council meetings.\n\
             - Be easy to understand for everyone in the community.\n\
             - Avoid overly formal or technical language.\n\
             - Omit any enthusiastic or promotional phrases.\n\
             - No questions.\n\
             - No emojis or symbols.\n\
             - Be within 70 words.\n\n\
             Write the posts as plain text paragraphs without numbering.",
            self.context, segment
        )
    }
}

/// Builds a request with the default meeting context.
pub fn build_prompt(task: GenerationTask, segment: &str) -> GenerationRequest<'_> {
    PromptBuilder::default().build(task, segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_parameters() {
        let summary = build_prompt(GenerationTask::Summarize, "x");
        assert_eq!((summary.max_tokens, summary.temperature), (300, 0.7));

        let compliance = build_prompt(GenerationTask::ComplianceAnalyze, "x");
        assert_eq!((compliance.max_tokens, compliance.temperature), (500, 0.7));

        let posts = build_prompt(GenerationTask::DraftPosts, "x");
        assert_eq!((posts.max_tokens, posts.temperature), (150, 0.5));
    }

    #[test]
    fn test_prompts_embed_segment_verbatim() {
        let segment = "Item 4:  the  zoning variance was approved 5-2.";
        for task in GenerationTask::ALL {
            let request = build_prompt(task, segment);
            assert!(request.prompt.starts_with(DEFAULT_CONTEXT));
            assert!(request.prompt.contains(segment), "{} prompt lost the segment", task);
            assert_eq!(request.segment, segment);
            assert_eq!(request.task, task);
        }
    }

    #[test]
    fn test_templates_are_deterministic() {
        let builder = PromptBuilder::new("The following text is from a county commission meeting.");
        let a = builder.build(GenerationTask::DraftPosts, "budget hearing");
        let b = builder.build(GenerationTask::DraftPosts, "budget hearing");
        assert_eq!(a, b);
        assert!(a.prompt.starts_with("The following text is from a county commission meeting."));
    }

    #[test]
    fn test_draft_posts_style_contract() {
        let prompt = build_prompt(GenerationTask::DraftPosts, "text").prompt;
        assert!(prompt.contains("Be within 70 words."));
        assert!(prompt.contains("No questions."));
        assert!(prompt.contains("No emojis or symbols."));
    }

    #[test]
    fn test_summary_output_format() {
        let prompt = build_prompt(GenerationTask::Summarize, "text").prompt;
        assert!(prompt.ends_with("Summary in bullet points:"));
    }
}
