//! Prompt construction for batched question answering over one chunk

use covenant_domain::{Chunk, Question};

/// Builds the single prompt sent for one chunk and its open questions
pub struct PromptBuilder<'a> {
    chunk: &'a Chunk,
    total_chunks: usize,
    questions: &'a [&'a Question],
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(chunk: &'a Chunk, total_chunks: usize, questions: &'a [&'a Question]) -> Self {
        Self {
            chunk,
            total_chunks,
            questions,
        }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(self.chunk.text.len() + 4_096);

        // 1. Role and rules
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 2. Questions with type hints and guidance
        prompt.push_str("## QUESTIONS (use these EXACT question_id values)\n\n");
        for question in self.questions {
            prompt.push_str(&format!(
                "- question_id: {} ({})\n  Question: {}\n",
                question.id,
                question.expected_type.prompt_hint(),
                question.text.trim()
            ));
            if !question.guidance.trim().is_empty() {
                prompt.push_str(&format!("  Look for: {}\n", question.guidance.trim()));
            }
        }
        prompt.push('\n');

        // 3. The excerpt
        prompt.push_str(&format!("## DOCUMENT EXCERPT ({})\n", self.describe_excerpt()));
        prompt.push_str("---\n");
        prompt.push_str(&self.chunk.text);
        if !self.chunk.text.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str("---\n\n");

        // 4. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    fn describe_excerpt(&self) -> String {
        let position = format!("part {} of {}", self.chunk.index + 1, self.total_chunks);
        match self.chunk.page_range() {
            Some((first, last)) if first == last => format!("{}, page {}", position, first),
            Some((first, last)) => format!("{}, pages {}-{}", position, first, last),
            None => position,
        }
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"You are a legal document analyst answering questions about a credit agreement.
You are given ONE excerpt of a longer agreement. Answer only from this excerpt.

For each question you can answer, provide:
- question_id: the EXACT id from the list below
- value: typed per the question (boolean true/false, integer, number, string, or array of strings); null if not found
- confidence: "high", "medium", or "low"
- source_text: the EXACT verbatim quote from the excerpt supporting the answer
- source_page: the page number of the quote (look for the nearest preceding [PAGE N] marker)
- source_section: the section reference, e.g. "Section 6.06(a)", if visible

Rules:
- Quote verbatim; never paraphrase in source_text
- "high" only when the excerpt states the answer explicitly
- "medium" when the answer is implied or relies on a definition not shown in full
- "low" when the evidence is indirect or incomplete
- If the excerpt does not address a question, omit it rather than guessing
- Numbers must be plain numerals (no words); percentages as numbers (e.g. 50 for 50%)"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"## OUTPUT FORMAT

Return a JSON array only:
[
  {
    "question_id": "example_id",
    "value": true,
    "confidence": "high",
    "source_text": "The exact quote from the excerpt...",
    "source_page": 47,
    "source_section": "Section 2.14(d)"
  }
]

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::AnswerType;

    fn chunk(pages: Vec<u32>) -> Chunk {
        Chunk {
            index: 1,
            start: 0,
            end: 24,
            pages,
            text: "[PAGE 3]\nSection 6.06 ...".to_string(),
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::new(
                "mfn_01",
                "MFN",
                AnswerType::Boolean,
                "Is there an MFN provision?",
                "Most favored nation protection on incremental term loans",
            ),
            Question::new("mfn_02", "MFN", AnswerType::Integer, "MFN sunset in months?", ""),
        ]
    }

    #[test]
    fn test_prompt_includes_questions_and_hints() {
        let chunk = chunk(vec![3]);
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();
        let prompt = PromptBuilder::new(&chunk, 4, &refs).build();

        assert!(prompt.contains("question_id: mfn_01 (boolean true/false)"));
        assert!(prompt.contains("Look for: Most favored nation"));
        assert!(prompt.contains("question_id: mfn_02 (integer)"));
    }

    #[test]
    fn test_guidance_line_omitted_when_empty() {
        let chunk = chunk(vec![3]);
        let qs = questions();
        let refs: Vec<&Question> = vec![&qs[1]];
        let prompt = PromptBuilder::new(&chunk, 4, &refs).build();
        assert!(!prompt.contains("Look for:"));
    }

    #[test]
    fn test_prompt_includes_excerpt_and_position() {
        let chunk = chunk(vec![3, 4]);
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();
        let prompt = PromptBuilder::new(&chunk, 4, &refs).build();

        assert!(prompt.contains("part 2 of 4, pages 3-4"));
        assert!(prompt.contains("[PAGE 3]\nSection 6.06 ..."));
        assert!(prompt.contains("Return ONLY valid JSON"));
    }

    #[test]
    fn test_single_page_excerpt() {
        let chunk = chunk(vec![3]);
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();
        let prompt = PromptBuilder::new(&chunk, 4, &refs).build();
        assert!(prompt.contains("part 2 of 4, page 3)"));
    }
}
