use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use robo_core::advisor;
use robo_core::domain::inputs::{InputError, RecommendationForm};
use robo_core::llm::LlmClient;
use robo_core::results::ResultsView;
use robo_core::session::{Page, SubmissionError};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::pages;
use crate::sessions::{SessionHandle, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub llm: Arc<dyn LlmClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/start", post(start))
        .route("/navigate/:page", post(navigate))
        .route("/recommend", post(recommend))
        .route("/new", post(new_recommendation))
        .route("/api/results", get(api_results))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = SessionHandle::from_headers(&headers);
    let html = state.sessions.with(handle.id, |session| {
        let flash = session.take_flash();
        pages::render(session, flash)
    });
    handle.respond(Html(html))
}

async fn start(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = SessionHandle::from_headers(&headers);
    state.sessions.with(handle.id, |session| session.start());
    handle.respond(Redirect::to("/"))
}

async fn navigate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(page): Path<String>,
) -> Response {
    let Ok(page) = page.parse::<Page>() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let handle = SessionHandle::from_headers(&headers);
    state.sessions.with(handle.id, |session| {
        if let Err(err) = session.navigate(page) {
            session.warn(err.to_string());
        }
    });
    handle.respond(Redirect::to("/"))
}

/// Form fields as text so that unparseable numbers come back as an inline
/// form error instead of a bare rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileFields {
    currency: String,
    investable_amount: String,
    risk_profile: String,
    max_yearly_loss: String,
    time_horizon: String,
}

impl ProfileFields {
    fn parse(&self) -> Result<RecommendationForm, InputError> {
        RecommendationForm::from_fields(
            &self.currency,
            &self.investable_amount,
            &self.risk_profile,
            &self.max_yearly_loss,
            &self.time_horizon,
        )
    }
}

async fn recommend(
    State(state): State<AppState>,
    headers: HeaderMap,
    fields: Result<Form<ProfileFields>, FormRejection>,
) -> Response {
    let handle = SessionHandle::from_headers(&headers);

    let form = match fields {
        Ok(Form(fields)) => fields.parse(),
        Err(rejection) => {
            tracing::warn!(session = %handle.id, error = %rejection, "undecodable investment profile");
            Err(InputError::NotANumber {
                field: "Investment profile",
                value: String::new(),
            })
        }
    };

    let inputs = state.sessions.with(handle.id, |session| match form {
        Ok(form) => session.begin_submission(form),
        Err(err) => {
            session.reject_submission(&err);
            Err(SubmissionError::Invalid(err))
        }
    });
    let inputs = match inputs {
        Ok(inputs) => inputs,
        Err(err) => {
            tracing::info!(session = %handle.id, error = %err, "rejected investment profile");
            return handle.respond(Redirect::to("/"));
        }
    };

    // Runs to completion even if the client goes away, so the session never
    // stays pending. The session lock is not held while the model call runs.
    let task = {
        let state = state.clone();
        let id = handle.id;
        tokio::spawn(async move {
            let outcome = advisor::generate_recommendation(state.llm.as_ref(), &inputs).await;
            if let Err(err) = &outcome {
                sentry_anyhow::capture_anyhow(err);
            }
            state
                .sessions
                .with(id, |session| session.complete_submission(outcome))
        })
    };

    let ok = match task.await {
        Ok(ok) => ok,
        Err(err) => {
            let err = anyhow::anyhow!("recommendation task failed: {err}");
            state
                .sessions
                .with(handle.id, |session| session.complete_submission(Err(err)))
        }
    };
    tracing::info!(
        session = %handle.id,
        ok,
        active_sessions = state.sessions.len(),
        "recommendation request finished"
    );

    handle.respond(Redirect::to("/"))
}

async fn new_recommendation(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let handle = SessionHandle::from_headers(&headers);
    state
        .sessions
        .with(handle.id, |session| session.new_recommendation());
    handle.respond(Redirect::to("/"))
}

async fn api_results(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let view = SessionHandle::existing(&headers).and_then(|id| {
        state
            .sessions
            .read(id, |session| session.recommendation().map(ResultsView::build))
            .flatten()
    });
    match view {
        Some(view) => Json(view).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
