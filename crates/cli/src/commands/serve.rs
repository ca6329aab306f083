use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use portfolio_kit_core::load_site_config;
use portfolio_kit_deployer::resolve::DEFAULT_BUILD_DIR;
use portfolio_kit_deployer::{DeployLocks, DeployOptions, DeploymentPipeline, DeploymentResult, DeploymentStatus};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type PipelineFactory = Arc<dyn Fn(&Path) -> DeploymentPipeline + Send + Sync>;

/// Shared server state. The pipeline is rebuilt for every request so edits
/// to `[deploy]` in portfolio.toml apply without a restart.
#[derive(Clone)]
pub struct AppState {
    project: PathBuf,
    pipeline_for: PipelineFactory,
    locks: DeployLocks,
}

impl AppState {
    pub fn new<F>(project: PathBuf, pipeline_for: F) -> Self
    where
        F: Fn(&Path) -> DeploymentPipeline + Send + Sync + 'static,
    {
        Self {
            project,
            pipeline_for: Arc::new(pipeline_for),
            locks: DeployLocks::new(),
        }
    }

    fn pipeline(&self) -> DeploymentPipeline {
        (self.pipeline_for)(&self.project)
    }
}

/// Failures that never reach the pipeline, or that the pipeline could not report
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("A deployment is already running for this project")]
    Conflict,

    #[error("Deployment failed unexpectedly: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "success": false,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Body of `POST /deploy`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeployRequest {
    pub force: bool,
    pub message: Option<String>,
}

/// Parse `{force?: bool, message?: string}` with explicit type errors.
///
/// An empty body is the same as `{}`.
pub fn parse_deploy_request(body: &[u8]) -> Result<DeployRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DeployRequest::default());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    let fields = match value {
        Value::Object(fields) => fields,
        Value::Null => return Ok(DeployRequest::default()),
        _ => {
            return Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            ));
        }
    };

    let force = match fields.get("force") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(force)) => *force,
        Some(_) => return Err(ApiError::BadRequest("force must be a boolean".to_string())),
    };
    let message = match fields.get("message") {
        None | Some(Value::Null) => None,
        Some(Value::String(message)) => Some(message.clone()),
        Some(_) => return Err(ApiError::BadRequest("message must be a string".to_string())),
    };

    Ok(DeployRequest { force, message })
}

async fn status_handler(State(state): State<AppState>) -> Json<DeploymentStatus> {
    Json(state.pipeline().status(&state.project, None).await)
}

async fn deploy_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DeploymentResult>, ApiError> {
    let request = parse_deploy_request(&body)?;
    let guard = state
        .locks
        .try_acquire(&state.project)
        .ok_or(ApiError::Conflict)?;

    let options = DeployOptions {
        message: request.message,
        force: request.force,
        ..Default::default()
    };
    info!(project = %state.project.display(), force = options.force, "Deployment requested");

    // Run detached so a panic in the pipeline becomes a 500 instead of
    // tearing down the connection
    let pipeline = state.pipeline();
    let project = state.project.clone();
    let task = tokio::spawn(async move {
        let _guard = guard;
        pipeline.deploy(&project, &options).await
    });

    match task.await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!(error = %e, "Deployment task failed");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

pub fn router(state: AppState, preview_dir: &Path) -> Router {
    Router::new()
        .route("/deploy/status", get(status_handler))
        .route("/deploy", post(deploy_handler))
        .fallback_service(ServeDir::new(preview_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build output directory served as the preview
fn preview_dir(project: &Path) -> PathBuf {
    let output = load_site_config(project)
        .ok()
        .and_then(|config| config.site.output)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));
    project.join(output)
}

/// Serve the deployment API and a preview of the build output
pub async fn run(path: PathBuf, host: String, port: u16) -> Result<()> {
    let project = super::project_dir(&path)?;
    let preview = preview_dir(&project);

    println!("🌐 Starting portfolio server...");
    println!("   Project: {}", project.display());
    println!("   Preview: {}", preview.display());

    let state = AppState::new(project.clone(), super::pipeline_for);
    let app = router(state, &preview);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    println!("\n🚀 Ready at: http://{}", addr);
    println!("   GET  /deploy/status");
    println!("   POST /deploy");
    println!("   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
