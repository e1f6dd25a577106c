use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ShapeError, ShapeGenerator};
use crate::config::GeminiConfig;
use crate::constants::COORDINATE_RANGE;

pub struct GeminiGenerator {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct PointsPayload {
    points: Option<Value>,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, ShapeError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request(&self, description: &str, point_count: usize) -> Result<Vec<f32>, ShapeError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ShapeError::MissingApiKey)?;

        log::info!(
            "Requesting {point_count} points for {description:?} from {}",
            self.config.model
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&build_request(description, point_count))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ShapeError::Status { status, body });
        }

        let body: GenerateResponse = serde_json::from_slice(&response.bytes().await?)?;
        parse_points(&response_text(body))
    }
}

impl ShapeGenerator for GeminiGenerator {
    fn generate(
        &self,
        description: &str,
        point_count: usize,
    ) -> impl Future<Output = Result<Vec<f32>, ShapeError>> + Send {
        self.request(description, point_count)
    }
}

fn build_prompt(description: &str, point_count: usize) -> String {
    format!(
        "Generate a 3D point cloud for the shape of: \"{description}\".\n\
         Return a single JSON object containing a flat array of numbers representing x, y, z coordinates.\n\
         There should be exactly {} numbers in the array (representing {point_count} points).\n\
         The coordinates should be normalized roughly between -{COORDINATE_RANGE} and {COORDINATE_RANGE}.\n\
         Distribute points evenly to form the volume or surface of the shape clearly.",
        point_count * 3
    )
}

fn points_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "points": {
                "type": "ARRAY",
                "items": { "type": "NUMBER" },
                "description": "Flat array of x, y, z coordinates. [x1, y1, z1, x2, y2, z2, ...]"
            }
        },
        "required": ["points"]
    })
}

fn build_request(description: &str, point_count: usize) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(build_prompt(description, point_count)),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: points_schema(),
        },
    }
}

/// Concatenated text of the first candidate, or an empty object if there is none.
fn response_text(body: GenerateResponse) -> String {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .unwrap_or_default()
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() {
        "{}".to_owned()
    } else {
        text
    }
}

/// Extract the `points` array from the model's JSON answer.
fn parse_points(text: &str) -> Result<Vec<f32>, ShapeError> {
    let payload: PointsPayload = serde_json::from_str(text)?;
    let Some(Value::Array(items)) = payload.points else {
        return Err(ShapeError::MissingPoints);
    };
    items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32).ok_or(ShapeError::NonNumeric))
        .collect()
}
