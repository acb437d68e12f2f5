//! Fact sets and where they come from.
//!
//! A [`FactSet`] always holds three statements with exactly one lie. Sets are
//! produced by a [`FactSource`] (normally the configured LLM providers); the
//! [`FactService`] wraps the source, shuffles what it returns and substitutes
//! a built-in set whenever generation fails.

mod history;
pub mod prompt;

pub use history::{FactHistory, HISTORY_CAPACITY, HISTORY_TRIM};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{GenerateRequest, LlmError, LlmManager};
use crate::types::{Difficulty, Fact, FACTS_PER_SET};

/// How many history entries are sent along with a request
pub const PROMPT_HISTORY: usize = 10;

/// Reasons a list of facts cannot form a set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactSetError {
    #[error("expected {expected} facts, got {0}", expected = FACTS_PER_SET)]
    WrongCount(usize),

    #[error("expected exactly one lie, got {0}")]
    LieCount(usize),

    #[error("fact {0} has no text")]
    BlankText(usize),
}

/// Errors from generating a fact set
#[derive(Debug, thiserror::Error)]
pub enum FactError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed fact payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid fact set: {0}")]
    Invalid(#[from] FactSetError),
}

/// Three statements, exactly one of them false
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FactSet {
    facts: Vec<Fact>,
}

impl FactSet {
    pub const LEN: usize = FACTS_PER_SET;

    /// Validate and wrap a list of facts
    pub fn new(facts: Vec<Fact>) -> Result<Self, FactSetError> {
        if facts.len() != Self::LEN {
            return Err(FactSetError::WrongCount(facts.len()));
        }

        if let Some(blank) = facts.iter().position(|f| f.text.trim().is_empty()) {
            return Err(FactSetError::BlankText(blank));
        }

        let lies = facts.iter().filter(|f| f.is_lie).count();
        if lies != 1 {
            return Err(FactSetError::LieCount(lies));
        }

        Ok(Self { facts })
    }

    /// Built-in set used whenever generation fails
    pub fn fallback() -> Self {
        Self {
            facts: vec![
                Fact::truth("The Sun is a star."),
                Fact::lie("The Moon is made of cheese."),
                Fact::truth("Water freezes at 0 °C."),
            ],
        }
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn get(&self, index: usize) -> Option<&Fact> {
        self.facts.get(index)
    }

    pub fn lie_index(&self) -> usize {
        // The constructor guarantees exactly one lie
        self.facts.iter().position(|f| f.is_lie).unwrap_or_default()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.facts.iter().map(|f| f.text.as_str())
    }

    /// Uniformly permute the statements
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.facts.shuffle(rng);
    }
}

/// Something that can produce fresh fact sets
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Generate a set for the tier; `recent` lists texts to avoid repeating
    async fn generate_facts(
        &self,
        difficulty: Difficulty,
        recent: &[String],
    ) -> Result<FactSet, FactError>;
}

#[derive(Debug, Deserialize)]
struct FactsPayload {
    facts: Vec<RawFact>,
}

#[derive(Debug, Deserialize)]
struct RawFact {
    text: String,
    #[serde(rename = "isLie", alias = "is_lie")]
    is_lie: bool,
}

/// Drop a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") on the opening line
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        // Fence on a single line: the payload starts at the first brace
        None => rest.find('{').map_or(rest, |start| &rest[start..]),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a provider answer into a validated set
pub fn parse_fact_response(text: &str) -> Result<FactSet, FactError> {
    let payload: FactsPayload = serde_json::from_str(strip_code_fence(text))?;
    let facts = payload
        .facts
        .into_iter()
        .map(|raw| Fact {
            text: raw.text.trim().to_string(),
            is_lie: raw.is_lie,
        })
        .collect();

    Ok(FactSet::new(facts)?)
}

/// Fact source backed by the configured LLM providers
pub struct LlmFactSource {
    manager: LlmManager,
    language: String,
    max_tokens: u32,
    timeout: Option<Duration>,
}

impl LlmFactSource {
    pub fn new(
        manager: LlmManager,
        language: String,
        max_tokens: u32,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            manager,
            language,
            max_tokens,
            timeout,
        }
    }
}

#[async_trait]
impl FactSource for LlmFactSource {
    async fn generate_facts(
        &self,
        difficulty: Difficulty,
        recent: &[String],
    ) -> Result<FactSet, FactError> {
        let topic = prompt::pick_topic(difficulty, &mut rand::rng());
        tracing::debug!("Generating facts for {} on topic {}", difficulty, topic);

        let request = GenerateRequest {
            system: prompt::SYSTEM_PROMPT.to_string(),
            prompt: prompt::build_fact_prompt(difficulty, topic, recent, &self.language),
            max_tokens: Some(self.max_tokens),
            timeout: self.timeout,
            json: true,
        };

        let response = self.manager.generate(request).await?;
        parse_fact_response(&response.text)
    }
}

/// Where a fetched set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactOrigin {
    Generated,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct FetchedFacts {
    pub set: FactSet,
    pub origin: FactOrigin,
}

/// Fetches shuffled fact sets, falling back to the built-in set on failure
#[derive(Clone)]
pub struct FactService {
    source: Option<Arc<dyn FactSource>>,
}

impl FactService {
    pub fn new(source: Arc<dyn FactSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// A service without a provider; every turn uses the built-in set
    pub fn fallback_only() -> Self {
        Self { source: None }
    }

    /// Fetch a set for the tier. Never fails.
    pub async fn fetch(&self, difficulty: Difficulty, recent: &[String]) -> FetchedFacts {
        let generated = match &self.source {
            Some(source) => match source.generate_facts(difficulty, recent).await {
                Ok(set) => Some(set),
                Err(e) => {
                    tracing::warn!("Fact generation failed, using fallback set: {}", e);
                    None
                }
            },
            None => {
                tracing::debug!("No fact source configured, using fallback set");
                None
            }
        };

        let (mut set, origin) = match generated {
            Some(set) => (set, FactOrigin::Generated),
            None => (FactSet::fallback(), FactOrigin::Fallback),
        };
        set.shuffle(&mut rand::rng());

        FetchedFacts { set, origin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedSource {
        answer: Result<Vec<Fact>, ()>,
        seen: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl FactSource for ScriptedSource {
        async fn generate_facts(
            &self,
            _difficulty: Difficulty,
            recent: &[String],
        ) -> Result<FactSet, FactError> {
            self.seen.lock().unwrap().push(recent.to_vec());
            match &self.answer {
                Ok(facts) => Ok(FactSet::new(facts.clone())?),
                Err(()) => Err(FactError::Llm(LlmError::ApiError("offline".to_string()))),
            }
        }
    }

    fn sorted_texts(set: &FactSet) -> Vec<String> {
        let mut texts: Vec<String> = set.texts().map(str::to_string).collect();
        texts.sort();
        texts
    }

    #[test]
    fn test_fact_set_requires_three_facts() {
        let result = FactSet::new(vec![Fact::lie("a"), Fact::truth("b")]);
        assert_eq!(result, Err(FactSetError::WrongCount(2)));
    }

    #[test]
    fn test_fact_set_requires_exactly_one_lie() {
        let none = FactSet::new(vec![Fact::truth("a"), Fact::truth("b"), Fact::truth("c")]);
        assert_eq!(none, Err(FactSetError::LieCount(0)));

        let two = FactSet::new(vec![Fact::lie("a"), Fact::lie("b"), Fact::truth("c")]);
        assert_eq!(two, Err(FactSetError::LieCount(2)));
    }

    #[test]
    fn test_fact_set_rejects_blank_text() {
        let result = FactSet::new(vec![Fact::lie("a"), Fact::truth("  "), Fact::truth("c")]);
        assert_eq!(result, Err(FactSetError::BlankText(1)));
    }

    #[test]
    fn test_fallback_holds_invariant() {
        let set = FactSet::fallback();
        assert_eq!(set.facts().len(), 3);
        assert_eq!(set.facts().iter().filter(|f| f.is_lie).count(), 1);
        assert_eq!(set.get(set.lie_index()).unwrap().text, "The Moon is made of cheese.");
    }

    #[test]
    fn test_shuffle_preserves_content() {
        let mut set = FactSet::fallback();
        let before = sorted_texts(&set);
        let mut rng = rand::rng();
        for _ in 0..20 {
            set.shuffle(&mut rng);
            assert_eq!(sorted_texts(&set), before);
            assert!(set.facts()[set.lie_index()].is_lie);
        }
    }

    #[test]
    fn test_parse_valid_response() {
        let text = r#"{"facts": [
            {"text": " Sharks are older than trees. ", "isLie": false},
            {"text": "Bananas grow on trees.", "isLie": true},
            {"text": "Honey never spoils.", "is_lie": false}
        ]}"#;

        let set = parse_fact_response(text).unwrap();
        assert_eq!(set.facts()[0].text, "Sharks are older than trees.");
        assert_eq!(set.lie_index(), 1);
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let text = "```json\n{\"facts\": [{\"text\": \"a\", \"isLie\": true}, \
                    {\"text\": \"b\", \"isLie\": false}, {\"text\": \"c\", \"isLie\": false}]}\n```";
        let set = parse_fact_response(text).unwrap();
        assert_eq!(set.lie_index(), 0);
    }

    #[test]
    fn test_parse_strips_single_line_code_fence() {
        let text = "```json {\"facts\": [{\"text\": \"a\", \"isLie\": false}, \
                    {\"text\": \"b\", \"isLie\": true}, {\"text\": \"c\", \"isLie\": false}]}```";
        let set = parse_fact_response(text).unwrap();
        assert_eq!(set.lie_index(), 1);
        assert_eq!(set.facts()[2].text, "c");

        // No info string either
        let bare = "```{\"facts\": [{\"text\": \"a\", \"isLie\": true}, \
                    {\"text\": \"b\", \"isLie\": false}, {\"text\": \"c\", \"isLie\": false}]}```";
        assert_eq!(parse_fact_response(bare).unwrap().lie_index(), 0);
    }

    #[test]
    fn test_parse_rejects_malformed_and_invalid() {
        assert!(matches!(
            parse_fact_response("not json"),
            Err(FactError::Malformed(_))
        ));
        assert!(matches!(
            parse_fact_response(r#"{"facts": []}"#),
            Err(FactError::Invalid(FactSetError::WrongCount(0)))
        ));
        assert!(matches!(
            parse_fact_response(r#"{"facts": [{"text": "a"}]}"#),
            Err(FactError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_uses_generated_set() {
        let source = Arc::new(ScriptedSource {
            answer: Ok(vec![
                Fact::truth("one"),
                Fact::truth("two"),
                Fact::lie("three"),
            ]),
            seen: Mutex::new(Vec::new()),
        });
        let service = FactService::new(source.clone());
        let recent = vec!["old fact".to_string()];

        let fetched = service.fetch(Difficulty::Age13To17, &recent).await;

        assert_eq!(fetched.origin, FactOrigin::Generated);
        assert_eq!(sorted_texts(&fetched.set), vec!["one", "three", "two"]);
        assert_eq!(fetched.set.get(fetched.set.lie_index()).unwrap().text, "three");
        assert_eq!(source.seen.lock().unwrap()[0], recent);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_on_failure() {
        let source = Arc::new(ScriptedSource {
            answer: Err(()),
            seen: Mutex::new(Vec::new()),
        });
        let service = FactService::new(source);

        for difficulty in Difficulty::ALL {
            let fetched = service.fetch(difficulty, &[]).await;
            assert_eq!(fetched.origin, FactOrigin::Fallback);
            assert_eq!(sorted_texts(&fetched.set), sorted_texts(&FactSet::fallback()));
            assert_eq!(
                fetched.set.get(fetched.set.lie_index()).unwrap().text,
                "The Moon is made of cheese."
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_falls_back_on_invalid_generated_set() {
        let source = Arc::new(ScriptedSource {
            answer: Ok(vec![Fact::lie("a"), Fact::lie("b"), Fact::truth("c")]),
            seen: Mutex::new(Vec::new()),
        });
        let fetched = FactService::new(source)
            .fetch(Difficulty::Age3To6, &[])
            .await;
        assert_eq!(fetched.origin, FactOrigin::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_only_service() {
        let fetched = FactService::fallback_only()
            .fetch(Difficulty::Age7To12, &[])
            .await;
        assert_eq!(fetched.origin, FactOrigin::Fallback);
        assert_eq!(fetched.set.facts().len(), 3);
    }
}
