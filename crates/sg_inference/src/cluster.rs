use std::sync::Arc;

use serde_json::json;
use sg_core::markdown::strip_code_fences;
use sg_core::{ClusterPlan, Error, GenerationCall, ModelTier, Result};
use tracing::{info, warn};

use crate::prompt::cluster_prompt;
use crate::router::ProviderRouter;

pub const SATELLITE_COUNT: usize = 6;

pub fn cluster_schema() -> serde_json::Value {
    let topic = json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "mainKeyword": { "type": "STRING" }
        },
        "required": ["title", "mainKeyword"]
    });
    json!({
        "type": "OBJECT",
        "properties": {
            "pillar": topic,
            "satellites": { "type": "ARRAY", "items": topic }
        },
        "required": ["pillar", "satellites"]
    })
}

/// Plans one pillar and its satellites with a single structured call to
/// the default provider.
#[derive(Debug, Clone)]
pub struct ClusterPlanner {
    router: Arc<ProviderRouter>,
    satellite_count: usize,
}

impl ClusterPlanner {
    pub fn new(router: Arc<ProviderRouter>) -> Self {
        Self {
            router,
            satellite_count: SATELLITE_COUNT,
        }
    }

    pub async fn plan(&self, topic: &str) -> Result<ClusterPlan> {
        let prompt = cluster_prompt(topic, self.satellite_count);
        let call = GenerationCall::new("", &prompt, ModelTier::Flash).with_json_schema(cluster_schema());
        let raw = self.router.call_default(&call).await?;
        let plan = parse_plan(&raw, self.satellite_count)?;
        info!(
            "Planned cluster \"{}\" with {} satellites",
            plan.pillar.title,
            plan.satellites.len()
        );
        Ok(plan)
    }
}

/// Decodes the planner output, dropping blank satellites and any beyond
/// `satellite_count`.
pub fn parse_plan(raw: &str, satellite_count: usize) -> Result<ClusterPlan> {
    let mut plan: ClusterPlan = serde_json::from_str(&strip_code_fences(raw))
        .map_err(|e| Error::Planning(format!("invalid cluster plan: {}", e)))?;

    if plan.pillar.title.trim().is_empty() {
        return Err(Error::Planning("cluster plan has no pillar title".to_string()));
    }
    plan.satellites.retain(|s| !s.title.trim().is_empty());
    if plan.satellites.is_empty() {
        return Err(Error::Planning("cluster plan has no satellites".to_string()));
    }
    if plan.satellites.len() > satellite_count {
        plan.satellites.truncate(satellite_count);
    } else if plan.satellites.len() < satellite_count {
        warn!(
            "Cluster plan has {} satellites, expected {}",
            plan.satellites.len(),
            satellite_count
        );
    }
    Ok(plan)
}
