// ============================================================
// Layer 3 — PromptRecord Domain Type
// ============================================================
// One supervised fine-tuning record in the Alpaca layout:
//
//   {
//     "instruction": "다음 문장을 요약하세요.",
//     "input":       "...",
//     "output":      "..."
//   }
//
// The record is rendered into two pieces of text:
//   - the PROMPT   (instruction + optional input + response header)
//   - the RESPONSE (the text the model should learn to produce)
//
// Only response tokens contribute to the loss; prompt tokens are
// masked with -1 when examples are built (see data::encoder).

use serde::{Deserialize, Serialize};

/// Header placed before the instruction text
pub const INSTRUCTION_HEADER: &str = "### 명령어:";
/// Header placed before the optional input text
pub const INPUT_HEADER: &str = "### 입력:";
/// Header placed before the response text
pub const RESPONSE_HEADER: &str = "### 응답:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub instruction: String,

    /// Extra context for the instruction, often empty
    #[serde(default)]
    pub input: String,

    pub output: String,
}

impl PromptRecord {
    pub fn new(
        instruction: impl Into<String>,
        input:       impl Into<String>,
        output:      impl Into<String>,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            input:       input.into(),
            output:      output.into(),
        }
    }

    /// Render the prompt half of the record.
    /// The input section is omitted when the input is blank.
    pub fn prompt(&self) -> String {
        let instruction = self.instruction.trim();
        let input       = self.input.trim();

        if input.is_empty() {
            format!("{INSTRUCTION_HEADER}\n{instruction}\n\n{RESPONSE_HEADER}\n")
        } else {
            format!(
                "{INSTRUCTION_HEADER}\n{instruction}\n\n{INPUT_HEADER}\n{input}\n\n{RESPONSE_HEADER}\n"
            )
        }
    }

    /// The text the model is trained to produce
    pub fn response(&self) -> &str {
        self.output.trim()
    }

    /// A record with no instruction or no output cannot form an example
    pub fn is_trainable(&self) -> bool {
        !self.instruction.trim().is_empty() && !self.response().is_empty()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_input_skips_input_section() {
        let record = PromptRecord::new("인사하세요", "  ", "안녕하세요");
        let prompt = record.prompt();
        assert!(prompt.starts_with(INSTRUCTION_HEADER));
        assert!(!prompt.contains(INPUT_HEADER));
        assert!(prompt.ends_with(&format!("{RESPONSE_HEADER}\n")));
    }

    #[test]
    fn test_prompt_with_input_keeps_order() {
        let record = PromptRecord::new("번역하세요", "hello", "안녕");
        let prompt = record.prompt();
        let i = prompt.find(INSTRUCTION_HEADER).unwrap();
        let n = prompt.find(INPUT_HEADER).unwrap();
        let r = prompt.find(RESPONSE_HEADER).unwrap();
        assert!(i < n && n < r);
        assert!(prompt.contains("hello"));
    }

    #[test]
    fn test_missing_input_field_deserialises_as_empty() {
        let json = r#"{"instruction": "a", "output": "b"}"#;
        let record: PromptRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.input, "");
        assert!(record.is_trainable());
    }

    #[test]
    fn test_blank_output_is_not_trainable() {
        let record = PromptRecord::new("a", "", "   ");
        assert!(!record.is_trainable());
    }
}
