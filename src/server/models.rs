use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// POST /generate request.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Natural-language description of the wanted query.
    pub query: String,
    /// Sampling temperature forwarded to the completion service.
    pub temp: f32,
    /// Table names the schema text is narrowed to.
    pub selected: Vec<String>,
    /// Per-request credential; falls back to the process default.
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub sql_query: String,
    pub used_tokens: u64,
}

/// POST /run request. Deliberately carries no api_key: running SQL never
/// touches the completion service.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub success: bool,
    pub columns: Vec<String>,
    pub results: Vec<Map<String, Value>>,
    pub seconds_elapsed: f64,
}

/// POST /generate_prompt request.
#[derive(Debug, Deserialize)]
pub struct GeneratePromptRequest {
    pub selected: Vec<String>,
    pub temp: f32,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratePromptResponse {
    pub success: bool,
    pub query: String,
    pub used_tokens: u64,
}

/// POST /generate_chart request.
#[derive(Debug, Deserialize)]
pub struct GenerateChartRequest {
    pub csv_data: String,
    pub temp: f32,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateChartResponse {
    pub success: bool,
    pub chart_type: String,
    pub chart_data: String,
    pub used_tokens: u64,
}

/// Uniform failure payload: every per-request error converts into this,
/// with the collaborator's message passed through verbatim.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}
