//! Prompt construction and reply parsing for plant identification.

use crate::error::{PlantError, PlantResult};
use crate::models::PlantRecord;
use crate::vision::PlantModel;

/// Fixed prompt; `{image_url}` is the only substitution.
const PROMPT_TEMPLATE: &str = r#"You are a plant identification and health assessment expert.
Analyze the plant in this image: {image_url}

Provide the following information in JSON format:
{
  "name": "Common Name",
  "scientificName": "Scientific Name",
  "description": "Description text",
  "careInstructions": {
    "water": "Water instructions",
    "light": "Light requirements",
    "soil": "Soil preferences",
    "temperature": "Temperature range"
  },
  "healthAssessment": {
    "status": "healthy|moderate|unhealthy",
    "issues": ["Issue 1", "Issue 2"],
    "recommendations": ["Recommendation 1", "Recommendation 2"]
  }
}
"#;

pub fn build_prompt(image_url: &str) -> String {
    PROMPT_TEMPLATE.replace("{image_url}", image_url)
}

/// Drop a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Skip a language tag, which may run straight into the body.
    let inner = inner.trim_start();
    let tag_len = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let body = inner[tag_len..].trim_start();
    if body.starts_with(['{', '[']) {
        body.trim_end()
    } else {
        inner.trim_end()
    }
}

/// Parse the model's reply into a [`PlantRecord`].
pub fn parse_plant_record(text: &str) -> PlantResult<PlantRecord> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        tracing::warn!(error = %e, reply = %text, "Model reply is not a valid plant record");
        PlantError::InvalidModelResponse(e)
    })
}

/// Ask the model about the image and parse its answer.
pub async fn identify_plant(model: &dyn PlantModel, image_url: &str) -> PlantResult<PlantRecord> {
    let prompt = build_prompt(image_url);
    let reply = model.complete(&prompt, image_url).await?;
    let record = parse_plant_record(&reply)?;

    tracing::info!(name = %record.name, status = ?record.health_assessment.status, "Identified plant");
    Ok(record)
}
