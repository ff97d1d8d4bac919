use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sg_core::markdown::strip_code_fences;
use sg_core::{GenerationCall, ModelTier, Result};
use tracing::{error, info};

use crate::prompt::{keyword_research_prompt, topic_suggestion_prompt};
use crate::router::ProviderRouter;

pub const TOPIC_SUGGESTION_COUNT: usize = 4;
pub const SECONDARY_KEYWORD_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSuggestion {
    pub topic: String,
    /// Estimated SEO potential, 0 to 100.
    pub score: u8,
}

#[derive(Debug, Deserialize)]
struct RawSuggestion {
    topic: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordResearch {
    #[serde(default)]
    pub main_keyword: String,
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
}

/// Niche narrowing for topic ideas.
#[derive(Debug, Clone, Default)]
pub struct NicheBrief {
    pub niche: String,
    pub category: String,
    pub sub_niche: Option<String>,
    pub micro_niche: Option<String>,
}

/// Topic and keyword research on the default provider.
#[derive(Debug, Clone)]
pub struct Researcher {
    router: Arc<ProviderRouter>,
}

impl Researcher {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self { router }
    }

    /// Suggests pillar topics. Failures degrade to an empty list.
    pub async fn suggest_topics(&self, brief: &NicheBrief) -> Vec<TopicSuggestion> {
        match self.try_suggest_topics(brief).await {
            Ok(topics) => topics,
            Err(e) => {
                error!("Error suggesting topics: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_suggest_topics(&self, brief: &NicheBrief) -> Result<Vec<TopicSuggestion>> {
        let prompt = topic_suggestion_prompt(
            &brief.niche,
            &brief.category,
            brief.sub_niche.as_deref(),
            brief.micro_niche.as_deref(),
            TOPIC_SUGGESTION_COUNT,
        );
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "topic": { "type": "STRING" },
                    "score": { "type": "INTEGER", "description": "Score from 0 to 100" }
                },
                "required": ["topic", "score"]
            }
        });
        let call = GenerationCall::new("", &prompt, ModelTier::Flash).with_json_schema(schema);
        let raw = self.router.call_default(&call).await?;
        Ok(parse_suggestions(&raw)?)
    }

    /// Finds the main keyword, audience and secondary keywords for a topic
    /// using search grounding.
    pub async fn research_keywords(&self, topic: &str) -> Result<KeywordResearch> {
        let prompt = keyword_research_prompt(topic, SECONDARY_KEYWORD_COUNT);
        let call = GenerationCall::new("", &prompt, ModelTier::Flash).with_grounded_search();
        let raw = self.router.call_default(&call).await?;
        let research: KeywordResearch = serde_json::from_str(&strip_code_fences(&raw))?;
        info!(
            "Research for \"{}\": main keyword \"{}\", {} secondary keywords",
            topic,
            research.main_keyword,
            research.secondary_keywords.len()
        );
        Ok(research)
    }
}

pub fn parse_suggestions(raw: &str) -> serde_json::Result<Vec<TopicSuggestion>> {
    let raw: Vec<RawSuggestion> = serde_json::from_str(&strip_code_fences(raw))?;
    Ok(raw
        .into_iter()
        .filter(|s| !s.topic.trim().is_empty())
        .take(TOPIC_SUGGESTION_COUNT)
        .map(|s| TopicSuggestion {
            topic: s.topic.trim().to_string(),
            score: s.score.round().clamp(0.0, 100.0) as u8,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::DummyProvider;
    use sg_core::Provider;

    fn researcher(provider: DummyProvider) -> (Researcher, Arc<DummyProvider>) {
        let provider = Arc::new(provider);
        let router = Arc::new(ProviderRouter::new().with_provider(provider.clone()));
        (Researcher::new(router), provider)
    }

    #[test]
    fn test_parse_suggestions_clamps_scores() {
        let raw = r#"[{"topic": "a", "score": 120}, {"topic": "b", "score": -3}, {"topic": " ", "score": 50}, {"topic": "c", "score": 88.6}]"#;
        let parsed = parse_suggestions(raw).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].score, 100);
        assert_eq!(parsed[1].score, 0);
        assert_eq!(parsed[2].score, 89);
    }

    #[tokio::test]
    async fn test_suggest_topics_degrades_to_empty() {
        let (researcher, _) = researcher(DummyProvider::always(Provider::Gemini, "not json"));
        let brief = NicheBrief {
            niche: "tech".to_string(),
            category: "ai".to_string(),
            ..Default::default()
        };
        assert!(researcher.suggest_topics(&brief).await.is_empty());
    }

    #[tokio::test]
    async fn test_research_keywords_uses_grounding() {
        let (researcher, provider) = researcher(DummyProvider::always(
            Provider::Gemini,
            r#"```json
{"mainKeyword": "ai tools", "audience": "marketers", "secondaryKeywords": ["ai writing"]}
```"#,
        ));
        let research = researcher.research_keywords("AI tools").await.unwrap();
        assert_eq!(research.main_keyword, "ai tools");
        assert_eq!(research.secondary_keywords, vec!["ai writing"]);
        assert!(provider.calls()[0].grounded_search);
    }

    #[tokio::test]
    async fn test_research_keywords_propagates_errors() {
        let (researcher, _) = researcher(DummyProvider::failing(Provider::Gemini, "down"));
        assert!(researcher.research_keywords("x").await.is_err());
    }

    #[tokio::test]
    async fn test_offline_router_answers_research() {
        let researcher = Researcher::new(Arc::new(ProviderRouter::offline()));
        let brief = NicheBrief {
            niche: "tech".to_string(),
            category: "ai".to_string(),
            ..Default::default()
        };
        assert_eq!(researcher.suggest_topics(&brief).await.len(), TOPIC_SUGGESTION_COUNT);
        let research = researcher.research_keywords("x").await.unwrap();
        assert_eq!(research.main_keyword, "offline keyword");
        assert_eq!(research.secondary_keywords.len(), 3);
    }
}
