//! Prompt construction for article generation and the auxiliary calls.
//!
//! Everything here is pure string building: identical requests give
//! identical prompts.

use sg_core::markdown::PLACEHOLDER_HOST;
use sg_core::{ContentKind, ContentRequest, TemplateId};
use url::Url;

/// Hard ceiling the model is told to respect. The validator's own
/// short-sentence heuristic is looser (`seo::SHORT_SENTENCE_MEAN_BELOW`).
pub const MAX_SENTENCE_WORDS: usize = 20;
pub const PILLAR_REPETITION_TARGET: usize = 60;
pub const SATELLITE_REPETITION_TARGET: usize = 15;
pub const PILLAR_LENGTH_GOAL: usize = 5000;
pub const IMAGE_COUNT: usize = 4;
pub const INTERNAL_LINK_PLACEHOLDER: &str = "[Internal Link](#)";

pub const SYSTEM_PERSONA: &str = r####"You are a senior SEO strategist who writes about AI tools.
You are judged on the quality, humanity and depth of your writing.

*** PERSONA ***
1. TONE: casual, authoritative, direct. Native American English.
   - Talk to the reader ("you"), not at them.
   - Use contractions (don't, can't, it's).
   - Have opinions. If a strategy is vital, say so.
2. BANNED PHRASES:
   - Never use: "In the realm of", "Unleash", "Unlock", "Tapestry", "Delve", "Game-changer", "Bustling", "In conclusion", "Summary", "Introduction", "landscape", "harness", "elevate", "mastering".
   - Never start a sentence with "However,", "Moreover," or "Furthermore,".
3. FORMATTING:
   - Short sentences: max 20 words. Split anything longer.
   - Paragraphs: 2-3 sentences max.
   - Headers in sentence case, e.g. "## best ai tools for writing".
   - No hashtags anywhere.
4. SEO:
   - Keyword density around 1.5%, related terms used naturally.
   - Main keyword in the H1, the first 100 words and the H2s.
   - Repeat the keyword instead of replacing it with a pronoun.
   - Use the secondary keywords exactly as given.

*** VISUALS ***
- Always include the 4 requested images (1 cover, 3 body).
- Body images are chart-style graphics.
"####;

pub const REVIEWER_PERSONA: &str = "You are a strict SEO Mentor.";

pub const GUIDE_SKELETON: &str = r#"**GUIDE STRUCTURE (MUST FOLLOW):**
1. **The Hook**: a story or a strong statement. No boring definitions.
2. **Deep Dive (What & Why)**: explain the concept simply but deeply.
3. **Strategy / How-To Guide**: step-by-step executable advice with numbered lists.
4. **Comparison / Tools**: a Markdown table comparing the top options.
5. **Advanced Tips**: expert advice others don't share.
6. **Common Mistakes**: what to avoid.
7. **FAQ**: answer 3 real user questions."#;

pub const LISTICLE_SKELETON: &str = r####"**LISTICLE STRUCTURE (MUST FOLLOW):**
1. **Intro**: why this list matters right now.
2. **Numbered Items**: 7-10 items, each an H2 starting with its number ("## 1. ...").
3. **Per Item**: what it is, who it's for, one concrete example.
4. **Quick Comparison**: a Markdown table of all items.
5. **Verdict**: the pick for each type of reader."####;

pub const HOW_TO_SKELETON: &str = r####"**HOW-TO STRUCTURE (MUST FOLLOW):**
1. **Outcome**: what the reader will achieve and how long it takes.
2. **Prerequisites**: tools and knowledge needed, as a bullet list.
3. **Steps**: each step an H2 ("## step 1: ..."), with H3 sub-steps where needed.
4. **Troubleshooting**: the problems readers usually hit.
5. **Next Steps**: where to go from here."####;

pub const COMPARISON_SKELETON: &str = r#"**COMPARISON STRUCTURE (MUST FOLLOW):**
1. **The Short Answer**: who wins for whom, in two sentences.
2. **Side-by-Side Table**: a Markdown table of features, pricing and limits.
3. **Head-to-Head Sections**: one H2 per criterion, with H3s per option.
4. **Use Cases**: which option fits which reader.
5. **Final Verdict**: a clear recommendation."#;

pub const CASE_STUDY_SKELETON: &str = r#"**CASE STUDY STRUCTURE (MUST FOLLOW):**
1. **The Result First**: the headline number or outcome.
2. **Background**: the situation before, with context.
3. **The Approach**: what was done, step by step.
4. **Results**: metrics, ideally in a Markdown table.
5. **Lessons**: what the reader can copy today."#;

/// Section skeleton for an explicit template.
pub fn template_skeleton(template: TemplateId) -> &'static str {
    match template {
        TemplateId::Guide => GUIDE_SKELETON,
        TemplateId::Listicle => LISTICLE_SKELETON,
        TemplateId::HowTo => HOW_TO_SKELETON,
        TemplateId::Comparison => COMPARISON_SKELETON,
        TemplateId::CaseStudy => CASE_STUDY_SKELETON,
    }
}

pub fn repetition_target(kind: ContentKind) -> usize {
    match kind {
        ContentKind::Pillar => PILLAR_REPETITION_TARGET,
        ContentKind::Satellite => SATELLITE_REPETITION_TARGET,
    }
}

fn placeholder_url(size: &str, text: &str) -> String {
    let base = format!("https://{}/{}/EEE/31343C", PLACEHOLDER_HOST, size);
    match Url::parse_with_params(&base, &[("text", text)]) {
        Ok(url) => url.to_string(),
        Err(_) => base,
    }
}

fn alignment_block(themes: &[String]) -> String {
    let themes: Vec<&String> = themes.iter().filter(|t| !t.trim().is_empty()).collect();
    if themes.is_empty() {
        return "**ALIGNMENT**: No specific alignment required.".to_string();
    }
    let lines: Vec<String> = themes.iter().map(|t| format!("- {}", t)).collect();
    format!(
        "**ALIGNMENT**: Use these specific themes for your H2 headers:\n{}",
        lines.join("\n")
    )
}

fn satellite_block(request: &ContentRequest) -> String {
    let context = match request.related_parent_topic.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(parent) => format!(
            "- Context: This is a satellite article for the Pillar Topic: \"{}\".",
            parent
        ),
        None => "- Context: This is a standalone satellite article.".to_string(),
    };
    format!(
        "**SATELLITE STRUCTURE**:\n{}\n- Answer the specific question immediately.\n- Give actionable steps.\n- Link back to the main topic context.",
        context
    )
}

fn structure_block(request: &ContentRequest) -> String {
    let mut block = match (request.template, request.kind) {
        (Some(template), _) => template_skeleton(template).to_string(),
        (None, ContentKind::Pillar) => GUIDE_SKELETON.to_string(),
        (None, ContentKind::Satellite) => satellite_block(request),
    };
    if request.template.is_some() && request.kind == ContentKind::Satellite {
        block.push_str("\n\n");
        block.push_str(&satellite_block(request));
    }
    if request.kind == ContentKind::Pillar || !request.alignment_themes.is_empty() {
        block.push_str("\n\n");
        block.push_str(&alignment_block(&request.alignment_themes));
    }
    if request.kind == ContentKind::Pillar {
        block.push_str(&format!(
            "\n\n**LENGTH GOAL**: Write as much as possible (aim for {} words). Do not stop early.",
            PILLAR_LENGTH_GOAL
        ));
    }
    block
}

fn images_block(request: &ContentRequest) -> String {
    let topic = &request.topic;
    let cover = placeholder_url("1200x600", &format!("COVER: {}", request.main_keyword));
    let wide = placeholder_url("800x400", "Wide Chart");
    let square = placeholder_url("600x600", "Square Diagram");
    let large = placeholder_url("1000x600", "Large Infographic");
    format!(
        r#"### IMAGES (MANDATORY - {count} TOTAL):
Generate exactly {count} images using Markdown syntax.
Prepend "Article: {topic} - " to every Alt text.

1. **Cover Image**: MUST BE placed immediately after the # H1 Title line.
   Format: `![COVER: {topic} - Detailed prompt]({cover})`
2. **Body 1**: Inside first major section. `![Article: {topic} - Detailed prompt]({wide})`
3. **Body 2**: Middle of article. `![Article: {topic} - Detailed prompt]({square})`
4. **Body 3**: Near end. `![Article: {topic} - Detailed prompt]({large})`"#,
        count = IMAGE_COUNT,
        topic = topic,
        cover = cover,
        wide = wide,
        square = square,
        large = large,
    )
}

/// Builds the article generation prompt: brief, structure, compliance
/// checklist, image requirements and the output contract.
pub fn build_prompt(request: &ContentRequest) -> String {
    let h1 = request.topic.to_lowercase();
    let label = match request.template {
        Some(template) => format!("{} {}", request.kind, template),
        None => request.kind.to_string(),
    };

    format!(
        r####"Write a world-class {label} article in Native American English.
**Topic**: {topic}
**Audience**: {audience}
**Main Keyword**: {keyword}
**Secondary Keywords (MANDATORY)**: {secondary}

{structure}

### *** MANDATORY COMPLIANCE CHECKLIST ***
[STRUCTURE]
- [ ] H1 matches EXACTLY: "{h1}"
- [ ] Cover Image is IMMEDIATELY after the H1 title.
- [ ] Coherent H2/H3 hierarchy (Sentence case only)
- [ ] Internal Link included to Pillar/Satellite (Use placeholder {link})

[SEO - SCORE 100%]
- [ ] Main Keyword in H1, First Sentence, and H2 headers.
- [ ] **DENSITY TARGET**: Use "{keyword}" at least {repetition} times.
- [ ] **LSI USAGE**: Use every single secondary keyword.

[QUALITY]
- [ ] Images have optimized ALT text based on the H2 context.
- [ ] **SENTENCE LENGTH**: STRICTLY < {max_words} WORDS per sentence.
- [ ] **TONE**: 100% Human, American, Non-Robotic.

### CRITICAL 100% SCORE EXECUTION PLAN:
1. Insert Main Keyword in the very first sentence.
2. Insert Main Keyword in the H1.
3. **PLACE COVER IMAGE DIRECTLY AFTER H1**.
4. Insert Main Keyword in at least 50% of H2s.
5. Write exactly 100 words of Intro before the first H2.
6. Use "###" for sub-sections.
7. Insert `{link}` explicitly in the text.

{images}

OUTPUT:
Raw Markdown starting with this JSON block:
```json
{{
  "title": "{h1}",
  "slug": "slug-url",
  "metaDescription": "seo description",
  "tags": ["optional", "tags"]
}}
```

# {h1}

![COVER: {topic}](...)

[Content starts here...]
"####,
        label = label,
        topic = request.topic,
        audience = request.audience,
        keyword = request.main_keyword,
        secondary = request.secondary_keywords.join(", "),
        structure = structure_block(request),
        h1 = h1,
        link = INTERNAL_LINK_PLACEHOLDER,
        repetition = repetition_target(request.kind),
        max_words = MAX_SENTENCE_WORDS,
        images = images_block(request),
    )
}

pub fn rewrite_prompt(selection: &str, tone: &str, length: &str) -> String {
    format!(
        r#"Act as the author (SEO expert). Rewrite the following text selection.
**Original Text**: "{selection}"
**Goal**: Rewrite it to be 100% human, American English.
**Target Tone**: {tone}
**Target Length**: {length}
**Constraints**: Max {max_words} words per sentence. No robotic words.
Return ONLY the rewritten text."#,
        selection = selection,
        tone = tone,
        length = length,
        max_words = MAX_SENTENCE_WORDS,
    )
}

pub fn refine_prompt(body: &str, instruction: &str) -> String {
    format!(
        r#"Act as the author of this article.
**CURRENT ARTICLE CONTENT (MARKDOWN):**
{body}
**USER INSTRUCTION:**
"{instruction}"
**TASK:**
Update the article content to satisfy the user instruction.
- If they ask to change the tone, rewrite the relevant parts.
- If they ask to add a section, add it in the correct place.
- If they ask to fix something, fix it.
- MAINTAIN all other formatting, images, and headers unless asked to change.
- STRICTLY follow the "Max {max_words} words per sentence" rule for any NEW text.
**OUTPUT:**
Return ONLY the fully updated Markdown content. No conversational filler."#,
        body = body,
        instruction = instruction,
        max_words = MAX_SENTENCE_WORDS,
    )
}

pub fn review_prompt(body: &str) -> String {
    format!(
        "Act as a peer reviewer for the following article based on our internal SEO guidelines.\nCheck for American English accuracy, {} Images, Short sentences, NO hashtags, Correct H1/H2/H3.\nProvide a bulleted list of specific improvements.\n\nARTICLE CONTENT:\n{}",
        IMAGE_COUNT, body
    )
}

pub fn cluster_prompt(topic: &str, satellite_count: usize) -> String {
    format!(
        r#"Create a content cluster plan for the topic: "{topic}".
I need:
1. One (1) PILLAR article title and its main keyword.
2. {count} SATELLITE article titles that answer specific questions related to the pillar, each with a unique main keyword.

Ensure the satellites are distinct and cover different search intents.
Derive the satellite titles DIRECTLY from potential H2 sections of the Pillar to ensure perfect topic cluster alignment."#,
        topic = topic,
        count = satellite_count,
    )
}

pub fn topic_suggestion_prompt(
    niche: &str,
    category: &str,
    sub_niche: Option<&str>,
    micro_niche: Option<&str>,
    count: usize,
) -> String {
    let mut prompt = format!(
        "Act as an expert SEO Strategist.\nMy niche is: \"{}\".\nBroad Category: \"{}\".\n",
        niche, category
    );
    if let Some(sub) = sub_niche.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("Specific Sub-Niche: \"{}\".\n", sub));
    }
    if let Some(micro) = micro_niche.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("Micro-Niche Context: \"{}\".\n", micro));
    }
    prompt.push_str(&format!(
        "\nGenerate exactly {} distinct, high-potential \"Main Topic\" titles for a Pillar or Authority article.\nProvide variety in angles (e.g., \"Ultimate Guide\", \"Comparative Listicle\", \"Strategic How-To\", \"Trend Analysis\").\n\nFor each topic, estimate a \"Viral/SEO Score\" from 0 to 100 based on search intent potential and click-through probability.\n\nReturn ONLY a JSON array of objects.",
        count
    ));
    prompt
}

pub fn keyword_research_prompt(topic: &str, secondary_count: usize) -> String {
    format!(
        r#"I need to write an SEO article about "{topic}".
Use Google Search to find:
1. The most relevant and high-traffic "Main Keyword" for this topic.
2. A specific "Target Audience" description based on who searches for this.
3. {count} relevant "Secondary Keywords" (LSI) that are currently trending or relevant.

Return the result as a valid JSON object with the following keys:
- "mainKeyword" (string)
- "audience" (string)
- "secondaryKeywords" (array of strings)

Do not add any markdown formatting or code blocks. Just the raw JSON string."#,
        topic = topic,
        count = secondary_count,
    )
}

/// Image prompt for an article image, from its alt text.
pub fn image_prompt(title: &str, alt: &str) -> String {
    format!("Article: {} - {}", title, alt)
}
