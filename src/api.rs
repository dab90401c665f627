//! HTTP surface for the progression engine.
//!
//! The practice pages raise events (task answered, AI question asked, active day)
//! and read progress back for rendering. A single async mutex around the engine
//! serializes every read-modify-persist cycle.

use crate::config::Config;
use crate::error::ProgressError;
use crate::gamification::{parse_amount, AwardOutcome, ProgressSummary, ProgressionEngine};
use crate::notify::{FanoutNotifier, LogNotifier, Notification, Notifier, RecordingNotifier};
use crate::store::KeyValueStore;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

pub type DynStore = Box<dyn KeyValueStore + Send>;

pub struct AppState {
    engine: Mutex<ProgressionEngine<DynStore>>,
    recorder: RecordingNotifier,
}

impl AppState {
    /// Builds the engine over `store`, logging notifications and keeping them
    /// for the response of the request that caused them.
    pub fn new(store: DynStore, config: &Config) -> Self {
        let recorder = RecordingNotifier::new();
        let sinks: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier), Box::new(recorder.clone())];
        let notifier = FanoutNotifier::new(sinks);
        let engine = ProgressionEngine::from_config(store, Box::new(notifier), config);
        Self {
            engine: Mutex::new(engine),
            recorder,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ProgressError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProgressError::InvalidAmount(_)
            | ProgressError::InvalidTarget(_)
            | ProgressError::Serialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Serialize)]
struct MutationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<AwardOutcome>,
    notifications: Vec<Notification>,
    progress: ProgressSummary,
}

#[derive(Deserialize)]
pub struct TaskAnsweredRequest {
    pub subject: String,
    pub correct: bool,
    pub seconds: Option<u64>,
}

#[derive(Deserialize)]
pub struct ActiveDayRequest {
    pub consecutive_days: u32,
}

#[derive(Deserialize)]
pub struct TargetQuery {
    pub target: Option<u64>,
}

#[derive(Serialize)]
struct SubjectProgress {
    subject: String,
    target: u64,
    percent: u8,
}

type ApiResult = Result<HttpResponse, ProgressError>;

// Runs one engine operation under the lock and reports the notifications it produced.
async fn mutate<F>(state: &AppState, op: F) -> ApiResult
where
    F: FnOnce(&mut ProgressionEngine<DynStore>) -> Result<Option<AwardOutcome>, ProgressError>,
{
    let mut engine = state.engine.lock().await;
    state.recorder.drain();
    let outcome = op(&mut *engine)?;
    Ok(HttpResponse::Ok().json(MutationResponse {
        outcome,
        notifications: state.recorder.drain(),
        progress: engine.summary(),
    }))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("ExamFlow progress service is running!")
}

async fn get_progress(state: web::Data<AppState>) -> HttpResponse {
    let engine = state.engine.lock().await;
    HttpResponse::Ok().json(engine.summary())
}

async fn get_achievements(state: web::Data<AppState>) -> HttpResponse {
    let engine = state.engine.lock().await;
    HttpResponse::Ok().json(engine.achievement_statuses())
}

async fn get_subject_progress(
    state: web::Data<AppState>,
    subject: web::Path<String>,
    query: web::Query<TargetQuery>,
) -> ApiResult {
    let engine = state.engine.lock().await;
    let target = query.target.unwrap_or_else(|| engine.subject_target());
    if target == 0 {
        return Err(ProgressError::InvalidTarget(target));
    }
    let subject = subject.into_inner();
    let percent = engine.subject_progress_percent(&subject, target);
    Ok(HttpResponse::Ok().json(SubjectProgress {
        subject,
        target,
        percent,
    }))
}

async fn award_xp(state: web::Data<AppState>, body: web::Json<Value>) -> ApiResult {
    let amount = parse_amount(body.get("amount").unwrap_or(&Value::Null))?;
    let subject = body.get("subject").and_then(Value::as_str).map(str::to_string);
    mutate(&state, |engine| {
        engine
            .award_experience(amount, subject.as_deref())
            .map(Some)
    })
    .await
}

async fn task_answered(state: web::Data<AppState>, req: web::Json<TaskAnsweredRequest>) -> ApiResult {
    mutate(&state, |engine| {
        Ok(Some(engine.on_task_answered(&req.subject, req.correct, req.seconds)))
    })
    .await
}

async fn ai_question(state: web::Data<AppState>) -> ApiResult {
    mutate(&state, |engine| Ok(Some(engine.on_ai_question()))).await
}

async fn active_day(state: web::Data<AppState>, req: web::Json<ActiveDayRequest>) -> ApiResult {
    mutate(&state, |engine| Ok(Some(engine.on_active_day(req.consecutive_days)))).await
}

async fn reset_progress(state: web::Data<AppState>) -> ApiResult {
    mutate(&state, |engine| {
        engine.reset();
        Ok(None)
    })
    .await
}

async fn export_progress(state: web::Data<AppState>) -> ApiResult {
    let engine = state.engine.lock().await;
    let payload = engine.export_json()?;
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .insert_header(("Content-Disposition", "attachment; filename=\"examflow_user_data.json\""))
        .body(payload))
}

async fn import_progress(state: web::Data<AppState>, body: String) -> ApiResult {
    mutate(&state, |engine| {
        engine.import_json(&body)?;
        Ok(None)
    })
    .await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/progress", web::get().to(get_progress))
        .route("/achievements", web::get().to(get_achievements))
        .route("/subjects/{name}/progress", web::get().to(get_subject_progress))
        .route("/xp", web::post().to(award_xp))
        .route("/events/task-answered", web::post().to(task_answered))
        .route("/events/ai-question", web::post().to(ai_question))
        .route("/events/active-day", web::post().to(active_day))
        .route("/reset", web::post().to(reset_progress))
        .route("/export", web::get().to(export_progress))
        .route("/import", web::post().to(import_progress));
}
