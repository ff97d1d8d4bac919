use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role an article plays inside a content cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentKind {
    #[default]
    Pillar,
    Satellite,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Pillar => "PILLAR",
            ContentKind::Satellite => "SATELLITE",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pillar" => Ok(ContentKind::Pillar),
            "satellite" => Ok(ContentKind::Satellite),
            other => Err(format!("Unknown content kind: {}", other)),
        }
    }
}

/// Structural preset selecting a fixed section skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    Guide,
    Listicle,
    HowTo,
    Comparison,
    CaseStudy,
}

impl TemplateId {
    pub const ALL: [TemplateId; 5] = [
        TemplateId::Guide,
        TemplateId::Listicle,
        TemplateId::HowTo,
        TemplateId::Comparison,
        TemplateId::CaseStudy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Guide => "guide",
            TemplateId::Listicle => "listicle",
            TemplateId::HowTo => "how-to",
            TemplateId::Comparison => "comparison",
            TemplateId::CaseStudy => "case-study",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        TemplateId::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("Unknown template: {}", s))
    }
}

/// Text generation backend. `Gemini` is the default provider every other
/// backend falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAi,
    Claude,
}

impl Provider {
    pub fn is_default(&self) -> bool {
        *self == Provider::default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAi => "OpenAI",
            Provider::Claude => "Claude",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "default" => Ok(Provider::Gemini),
            "openai" | "chatgpt" => Ok(Provider::OpenAi),
            "claude" | "anthropic" => Ok(Provider::Claude),
            other => Err(format!(
                "Unknown provider: {}. Available providers: gemini, openai, claude",
                other
            )),
        }
    }
}

/// Input to a single article generation.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub topic: String,
    pub audience: String,
    pub main_keyword: String,
    pub secondary_keywords: Vec<String>,
    pub kind: ContentKind,
    pub template: Option<TemplateId>,
    pub related_parent_topic: Option<String>,
    #[serde(default)]
    pub alignment_themes: Vec<String>,
    pub provider: Provider,
    #[serde(skip)]
    pub credential: Option<String>,
}

impl fmt::Debug for ContentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRequest")
            .field("topic", &self.topic)
            .field("audience", &self.audience)
            .field("main_keyword", &self.main_keyword)
            .field("secondary_keywords", &self.secondary_keywords)
            .field("kind", &self.kind)
            .field("template", &self.template)
            .field("related_parent_topic", &self.related_parent_topic)
            .field("alignment_themes", &self.alignment_themes)
            .field("provider", &self.provider)
            .field("credential", &self.credential.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ContentRequest {
    pub fn new(topic: impl Into<String>, main_keyword: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            main_keyword: main_keyword.into(),
            ..Default::default()
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Appends secondary keywords, skipping blanks and case-insensitive duplicates.
    pub fn with_secondary_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for keyword in keywords {
            let keyword = keyword.into();
            let trimmed = keyword.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !self
                .secondary_keywords
                .iter()
                .any(|k| k.eq_ignore_ascii_case(trimmed))
            {
                self.secondary_keywords.push(trimmed.to_string());
            }
        }
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_template(mut self, template: TemplateId) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_parent_topic(mut self, parent: impl Into<String>) -> Self {
        self.related_parent_topic = Some(parent.into());
        self
    }

    pub fn with_alignment_themes(mut self, themes: Vec<String>) -> Self {
        self.alignment_themes = themes;
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential.filter(|c| !c.trim().is_empty());
        self
    }
}

/// Metadata parsed from the JSON preamble of a generated article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    pub title: String,
    pub slug: String,
    pub meta_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ArticleMetadata {
    /// Metadata used whenever the provider's preamble is missing or unusable.
    pub fn fallback(topic: &str) -> Self {
        Self {
            title: topic.to_string(),
            slug: crate::markdown::slugify(topic),
            meta_description: format!("A comprehensive guide about {}.", topic),
            tags: Vec::new(),
        }
    }
}

/// Immutable snapshot of an article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleVersion {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub body_markdown: String,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DensityBand {
    Low,
    Good,
    High,
}

impl fmt::Display for DensityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DensityBand::Low => "Low",
            DensityBand::Good => "Good",
            DensityBand::High => "High",
        };
        f.write_str(label)
    }
}

/// Output of the SEO validator. Always recomputed as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub has_h1: bool,
    pub keyword_in_h1: bool,
    pub has_subheading_structure: bool,
    pub keyword_in_intro: bool,
    pub keyword_density_band: DensityBand,
    pub keyword_density: f64,
    pub keyword_occurrences: usize,
    pub word_count: usize,
    pub secondary_keyword_hits: usize,
    pub has_short_sentences: bool,
    pub has_internal_links: bool,
    pub score: u8,
}

/// The unit persisted and displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub kind: ContentKind,
    pub topic: String,
    pub main_keyword: String,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    pub metadata: ArticleMetadata,
    pub body_markdown: String,
    pub validation: Option<ValidationResult>,
    #[serde(default)]
    pub revision_history: Vec<ArticleVersion>,
    #[serde(default)]
    pub conversation_log: Vec<ChatTurn>,
    pub generated_by: Provider,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Builds a freshly generated article and scores it.
    pub fn new(
        request: &ContentRequest,
        metadata: ArticleMetadata,
        body_markdown: String,
        generated_by: Provider,
    ) -> Self {
        let article = Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: request.kind,
            topic: request.topic.clone(),
            main_keyword: request.main_keyword.clone(),
            secondary_keywords: request.secondary_keywords.clone(),
            metadata,
            body_markdown,
            validation: None,
            revision_history: Vec::new(),
            conversation_log: Vec::new(),
            generated_by,
            created_at: Utc::now(),
        };
        article.revalidated()
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Recomputes the validation report from the current body.
    pub fn revalidated(mut self) -> Self {
        self.validation = Some(crate::seo::validate(
            &self.body_markdown,
            &self.main_keyword,
            &self.secondary_keywords,
        ));
        self
    }

    pub fn score(&self) -> Option<u8> {
        self.validation.as_ref().map(|v| v.score)
    }

    /// Title, slug and meta description header followed by the body, the
    /// shape handed to publishing collaborators.
    pub fn export_markdown(&self) -> String {
        format!(
            "# {}\n\n**Slug:** {}\n**Meta Description:** {}\n\n---\n\n{}",
            self.metadata.title, self.metadata.slug, self.metadata.meta_description, self.body_markdown
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTopic {
    pub title: String,
    pub main_keyword: String,
}

/// One pillar plus its satellites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPlan {
    pub pillar: ClusterTopic,
    pub satellites: Vec<ClusterTopic>,
}

impl ClusterPlan {
    /// Satellite titles, used as the pillar's H2 themes.
    pub fn alignment_themes(&self) -> Vec<String> {
        self.satellites.iter().map(|s| s.title.clone()).collect()
    }

    /// Pillar plus satellites.
    pub fn task_count(&self) -> usize {
        1 + self.satellites.len()
    }
}
