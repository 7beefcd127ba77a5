//! REST API for similtext.
//!
//! Thin JSON layer over a [`SharedIndex`] backed by a storage directory.
//! Every request opens the index from disk, and mutations save before the
//! response is sent. Engine calls run on actix's blocking thread pool.
//!
//! ## Endpoints
//!
//! - `GET /` - Health check
//! - `POST /init` - Rebuild the index from `[[id, text], ...]`
//! - `GET /list` - Indexed document ids
//! - `POST /check` - Most similar document for `[id, text]`, indexing the text on a match
//! - `POST /scores` - Term weights of document `id`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{App, HttpServer};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = similtext::server::app_state("storage");
//!     HttpServer::new(move || {
//!         App::new()
//!             .app_data(state.clone())
//!             .configure(similtext::server::config)
//!     })
//!     .bind("127.0.0.1:5050")?
//!     .run()
//!     .await
//! }
//! ```

use crate::engine::DocId;
use crate::error::EngineError;
use crate::index::SharedIndex;
use crate::store::DirStore;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type AppState = web::Data<SharedIndex<DirStore>>;

/// Builds the shared state for the given storage directory.
pub fn app_state(storage_dir: impl Into<PathBuf>) -> AppState {
    web::Data::new(SharedIndex::new(DirStore::new(storage_dir)))
}

// --- Request structs ---

/// One `[id, text]` pair; either side may be `null`.
#[derive(Deserialize)]
struct DocumentEntry(Option<DocId>, Option<String>);

// --- Response structs ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: &EngineError) -> HttpResponse {
    let body = ErrorResponse { error: e.to_string() };
    match e {
        EngineError::EmptyInput | EngineError::EmptyCorpus | EngineError::DimensionMismatch { .. } => {
            tracing::warn!("bad request: {}", e);
            HttpResponse::BadRequest().json(body)
        }
        EngineError::NotFitted => HttpResponse::Conflict().json(body),
        EngineError::CorruptState(_) | EngineError::StorageFailure { .. } => {
            tracing::error!("index failure: {}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Runs a blocking engine call and maps both layers of failure.
async fn run_blocking<T, F>(op: F) -> Result<T, HttpResponse>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match web::block(op).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(e) => {
            tracing::error!("blocking task failed: {}", e);
            Err(HttpResponse::InternalServerError().json(ErrorResponse { error: e.to_string() }))
        }
    }
}

// --- Handlers ---

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse { status: "running" })
}

async fn init_handler(index: AppState, body: web::Json<Vec<DocumentEntry>>) -> HttpResponse {
    let documents: Vec<(DocId, String)> = body.into_inner()
        .into_iter()
        .filter_map(|DocumentEntry(id, text)| Some((id?, text?)))
        .collect();

    match run_blocking(move || index.rebuild(documents)).await {
        Ok(ids) => HttpResponse::Ok().json(ids),
        Err(response) => response,
    }
}

async fn list_handler(index: AppState) -> HttpResponse {
    match run_blocking(move || index.list_ids()).await {
        Ok(ids) => HttpResponse::Ok().json(ids),
        Err(response) => response,
    }
}

async fn check_handler(index: AppState, body: web::Json<DocumentEntry>) -> HttpResponse {
    let DocumentEntry(id, text) = body.into_inner();
    let (Some(id), Some(text)) = (id, text) else {
        return error_response(&EngineError::EmptyInput);
    };

    match run_blocking(move || index.query_and_index(id, &text)).await {
        Ok(found) => HttpResponse::Ok().json(found.map(|m| m.id)),
        Err(response) => response,
    }
}

async fn scores_handler(index: AppState, body: web::Json<DocId>) -> HttpResponse {
    let id = body.into_inner();
    match run_blocking(move || index.scores_for(&id)).await {
        Ok(scores) => HttpResponse::Ok().json(scores),
        Err(response) => response,
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(crate::config::MAX_JSON_PAYLOAD))
       .service(web::resource("/").route(web::get().to(health_handler)))
       .service(web::resource("/init").route(web::post().to(init_handler)))
       .service(web::resource("/list").route(web::get().to(list_handler)))
       .service(web::resource("/check").route(web::post().to(check_handler)))
       .service(web::resource("/scores").route(web::post().to(scores_handler)));
}
