//! Vocabulary lists and comprehension quizzes generated from a transcript.

use super::{create_llm, ChatMessage, LLM};
use crate::config::StudyConfig;
use anyhow::{anyhow, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Important word with its meaning and an example sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub meaning: String,
    pub example: String,
}

/// Important phrase with its meaning and an example sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseEntry {
    pub phrase: String,
    pub meaning: String,
    pub example: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabularyList {
    #[serde(default)]
    pub important_words: Vec<WordEntry>,
    #[serde(default)]
    pub important_phrases: Vec<PhraseEntry>,
}

impl VocabularyList {
    pub fn is_empty(&self) -> bool {
        self.important_words.is_empty() && self.important_phrases.is_empty()
    }
}

/// Multiple-choice comprehension question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub choices: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl QuizItem {
    /// The answer must be one of at least two choices
    pub fn is_well_formed(&self) -> bool {
        self.choices.len() >= 2 && self.choices.iter().any(|choice| choice == &self.answer)
    }
}

#[derive(Debug, Deserialize)]
struct QuizResponse {
    quizzes: Vec<QuizItem>,
}

/// Generates study material through a text completion service
pub struct StudyMaterialGenerator {
    llm: Box<dyn LLM>,
    meaning_language: String,
}

impl StudyMaterialGenerator {
    /// Create a generator from configuration
    pub fn new(config: &StudyConfig) -> Result<Self> {
        let llm = create_llm(&config.provider)?;
        info!(
            "✅ Study material generator initialized with {:?} provider",
            config.provider.provider
        );
        Ok(Self::with_llm(llm, config.meaning_language.clone()))
    }

    /// Create a generator around an existing LLM
    pub fn with_llm(llm: Box<dyn LLM>, meaning_language: String) -> Self {
        Self {
            llm,
            meaning_language,
        }
    }

    /// Extract important words and phrases from English text
    pub async fn extract_vocabulary(&self, text: &str) -> Result<VocabularyList> {
        if text.trim().is_empty() {
            return Ok(VocabularyList::default());
        }

        let prompt = format!(
            "Extract the important words and phrases from the following English text.\n\
             Give each meaning in {language}.\n\
             Return only JSON in this shape:\n\
             {{\n  \"important_words\": [{{\"word\": \"...\", \"meaning\": \"...\", \"example\": \"...\"}}],\n  \
             \"important_phrases\": [{{\"phrase\": \"...\", \"meaning\": \"...\", \"example\": \"...\"}}]\n}}\n\n\
             Text:\n{text}",
            language = self.meaning_language,
            text = text
        );

        let messages = vec![
            ChatMessage::system(
                "You are a helpful assistant that extracts important words and phrases from English text.",
            ),
            ChatMessage::user(prompt),
        ];

        let response = self.llm.chat(messages).await?;
        debug!("Vocabulary extraction completed (tokens: {:?})", response.tokens_used);

        parse_json_payload(&response.content)
    }

    /// Generate comprehension questions about English text
    pub async fn generate_quiz(&self, text: &str) -> Result<Vec<QuizItem>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let prompt = format!(
            "Create English comprehension quiz questions about the following conversation.\n\
             Cover the content, the meaning of key words and phrases, the context, and the speaker's intent.\n\
             Return only JSON in this shape:\n\
             {{\n  \"quizzes\": [{{\"question\": \"...\", \"choices\": [\"...\", \"...\", \"...\", \"...\"], \
             \"answer\": \"...\", \"explanation\": \"...\"}}]\n}}\n\n\
             Conversation:\n{}",
            text
        );

        let messages = vec![
            ChatMessage::system("You are a helpful assistant that creates English comprehension quizzes."),
            ChatMessage::user(prompt),
        ];

        let response = self.llm.chat(messages).await?;
        debug!("Quiz generation completed (tokens: {:?})", response.tokens_used);

        let parsed: QuizResponse = parse_json_payload(&response.content)?;
        Ok(parsed.quizzes)
    }
}

/// Parse a JSON object from a completion, accepting a fenced code block around it
fn parse_json_payload<T: DeserializeOwned>(content: &str) -> Result<T> {
    let trimmed = content.trim();
    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Ok(re) = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```") {
        if let Some(inner) = re.captures(trimmed).and_then(|caps| caps.get(1)) {
            if let Ok(parsed) = serde_json::from_str::<T>(inner.as_str()) {
                return Ok(parsed);
            }
        }
    }

    // Last resort: outermost braces
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Ok(parsed);
            }
        }
    }

    let preview: String = trimmed.chars().take(200).collect();
    Err(anyhow!("Could not parse completion as JSON: {}", preview))
}
