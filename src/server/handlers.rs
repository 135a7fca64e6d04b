use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    response::{Html, IntoResponse},
    Json,
};

use crate::catalog::schema_compiler;
use crate::llm;
use crate::prompt;

use super::models::{
    ErrorResponse, GenerateChartRequest, GenerateChartResponse, GeneratePromptRequest,
    GeneratePromptResponse, GenerateRequest, GenerateResponse, RunRequest, RunResponse,
};
use super::{query_runner, AppState};

/// Simple health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "sqlscribe",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /: the authoring page, with the full schema text and the structured
/// schema JSON spliced into the page template.
pub async fn index(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, Json<ErrorResponse>> {
    let page = state
        .pages
        .load("index")
        .map_err(|e| Json(ErrorResponse::new(e)))?;

    let has_api_key = if state.config.default_api_key.is_some() {
        "true"
    } else {
        "false"
    };

    Ok(Html(prompt::render(
        &page,
        &[
            ("sql_schema", state.schema_text.as_str()),
            ("json_data", state.schema_json.as_str()),
            ("has_api_key", has_api_key),
        ],
    )))
}

/// POST /generate: schema subset plus user request in, generated SQL out.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, Json<ErrorResponse>> {
    let api_key = request_api_key(&state, payload.api_key.as_deref())?;

    log::info!(
        "Generating SQL: {} selected tables, temperature {}",
        payload.selected.len(),
        payload.temp
    );
    log::debug!("User input: {}", payload.query);

    let selection: HashSet<String> = payload.selected.into_iter().collect();
    let regen_schema = schema_compiler::render_subset(&state.snapshot, &state.comments, &selection);

    // Reloaded per request so prompts/sql.txt can be edited on the fly.
    let template = state
        .prompts
        .load("sql")
        .map_err(|e| Json(ErrorResponse::new(e)))?;
    let final_prompt = prompt::render(
        &template,
        &[
            ("regen_schema", regen_schema.as_str()),
            ("user_input", payload.query.as_str()),
        ],
    );
    log::debug!("Final prompt:\n{}", final_prompt);

    let completion = state
        .completions
        .complete(&api_key, &final_prompt, payload.temp, llm::SQL_MAX_TOKENS)
        .await
        .map_err(|e| Json(ErrorResponse::new(e)))?;

    log::info!("Generated SQL query: {}", completion.text);

    Ok(Json(GenerateResponse {
        success: true,
        sql_query: completion.text,
        used_tokens: completion.total_tokens,
    }))
}

/// POST /run: execute the user-approved SQL and return the result table.
pub async fn run_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<RunResponse>, Json<ErrorResponse>> {
    let started = Instant::now();
    log::info!("Run SQL query: {}", payload.query);

    let (columns, results) = query_runner::execute(&state.clickhouse, &payload.query)
        .await
        .map_err(|e| Json(ErrorResponse::new(e)))?;

    log::info!(
        "Query returned {} rows in {:.3}s",
        results.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(Json(RunResponse {
        success: true,
        columns,
        results,
        seconds_elapsed: started.elapsed().as_secs_f64(),
    }))
}

/// POST /generate_prompt: suggest a natural-language question for the
/// selected tables.
pub async fn generate_prompt(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GeneratePromptRequest>,
) -> Result<Json<GeneratePromptResponse>, Json<ErrorResponse>> {
    let api_key = request_api_key(&state, payload.api_key.as_deref())?;

    let selection: HashSet<String> = payload.selected.into_iter().collect();
    let regen_schema = schema_compiler::render_subset(&state.snapshot, &state.comments, &selection);

    let template = state
        .prompts
        .load("idk")
        .map_err(|e| Json(ErrorResponse::new(e)))?;
    let final_prompt = prompt::render(&template, &[("regen_schema", regen_schema.as_str())]);
    log::debug!("Final prompt:\n{}", final_prompt);

    let completion = state
        .completions
        .complete(&api_key, &final_prompt, payload.temp, llm::SQL_MAX_TOKENS)
        .await
        .map_err(|e| Json(ErrorResponse::new(e)))?;

    log::info!("Suggested prompt: {}", completion.text);

    Ok(Json(GeneratePromptResponse {
        success: true,
        query: completion.text,
        used_tokens: completion.total_tokens,
    }))
}

/// POST /generate_chart: turn CSV result data into chart pseudo-code.
pub async fn generate_chart(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateChartRequest>,
) -> Result<Json<GenerateChartResponse>, Json<ErrorResponse>> {
    let api_key = request_api_key(&state, payload.api_key.as_deref())?;

    let template = state
        .prompts
        .load("graph")
        .map_err(|e| Json(ErrorResponse::new(e)))?;
    let final_prompt = prompt::render(&template, &[("csv_data", payload.csv_data.as_str())]);

    let completion = state
        .completions
        .complete(&api_key, &final_prompt, payload.temp, llm::CHART_MAX_TOKENS)
        .await
        .map_err(|e| Json(ErrorResponse::new(e)))?;

    let (chart_type, chart_data) =
        split_chart_response(&completion.text).map_err(|e| Json(ErrorResponse::new(e)))?;

    Ok(Json(GenerateChartResponse {
        success: true,
        chart_type,
        chart_data,
        used_tokens: completion.total_tokens,
    }))
}

/// Resolve the credential for one request: the body-supplied key wins,
/// otherwise the process default. Nothing global is mutated; the key only
/// exists on this request's call chain.
fn request_api_key(
    state: &AppState,
    supplied: Option<&str>,
) -> Result<String, Json<ErrorResponse>> {
    resolve_api_key(state.config.default_api_key.as_deref(), supplied)
        .map_err(|e| Json(ErrorResponse::new(e)))
}

fn resolve_api_key(default_key: Option<&str>, supplied: Option<&str>) -> Result<String, String> {
    if let Some(key) = supplied.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    match default_key {
        Some(key) => Ok(key.to_string()),
        None => Err(
            "No API key available. Set OPENAI_API_KEY in the environment or provide a key in the UI."
                .to_string(),
        ),
    }
}

/// The chart completion is expected as `type|data` pseudo-code. A response
/// without the delimiter becomes a uniform error instead of a panic.
fn split_chart_response(text: &str) -> Result<(String, String), String> {
    match text.split_once('|') {
        Some((chart_type, chart_data)) => Ok((chart_type.to_string(), chart_data.to_string())),
        None => Err(format!(
            "Malformed chart response, expected \"type|data\": {}",
            text
        )),
    }
}
