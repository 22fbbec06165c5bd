use crate::assembler::StatementMeta;
use crate::db;
use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rand::RngCore;
use tower_http::cors::{Any, CorsLayer};
use trial_proofs::aggregate::{self, QuorumPolicy};
use trial_proofs::canonical;
use trial_proofs::disclosure::{self, DisclosureView, StudyContext};
use trial_proofs::witness::{PrivateStatistics, PrivateWitnessStore};
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/studies", post(create_study))
        .route("/api/v1/studies/:id/contributions", post(submit_contribution))
        .route("/api/v1/studies/:id/aggregate", post(aggregate_study))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/studies/:id", get(get_study))
        .route("/api/v1/studies/:id/disclosure", get(disclose_study))
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // In production, this should be a strong secret from environment.
    let expected_key = std::env::var("API_KEY").unwrap_or_else(|_| "dev-secret-key".to_string());

    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key == expected_key.as_str() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("unauthorized access attempt");
    Err(StatusCode::UNAUTHORIZED)
}

async fn create_study(
    State(state): State<AppState>,
    Json(req): Json<StudyCreateRequest>,
) -> Result<Json<StudyCreateResponse>, ApiError> {
    let fingerprint_hex = canonical::fingerprint_hex(&req.descriptor)?;
    let methodology_hex = canonical::methodology_fingerprint_hex(&req.descriptor)?;

    let study_id = Uuid::new_v4();
    db::insert_study(&state.db, study_id, &req.descriptor, &fingerprint_hex, &methodology_hex)
        .await?;

    tracing::info!(%study_id, %fingerprint_hex, "study registered");

    Ok(Json(StudyCreateResponse {
        study_id,
        fingerprint_hex,
        methodology_fingerprint_hex: methodology_hex,
    }))
}

async fn get_study(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudyGetResponse>, ApiError> {
    let Some(study) = db::get_study(&state.db, id).await? else {
        return Err(ApiError::NotFound("study not found".to_string()));
    };

    let (contributions_total, contributions_verified) =
        db::count_contributions(&state.db, id).await?;

    Ok(Json(StudyGetResponse {
        study_id: id,
        created_at: study.created_at,
        fingerprint_hex: study.fingerprint_hex,
        methodology_fingerprint_hex: study.methodology_hex,
        contributions_total,
        contributions_verified,
        quorum_met: contributions_verified as usize >= state.quorum.min_verified,
    }))
}

async fn submit_contribution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ContributionRequest>,
) -> Result<Json<ContributionResponse>, ApiError> {
    let Some(study) = db::get_study(&state.db, id).await? else {
        return Err(ApiError::NotFound("study not found".to_string()));
    };

    if req.hospital_id.trim().is_empty() {
        return Err(ApiError::BadRequest("hospital_id is empty".to_string()));
    }

    if db::contribution_exists(&state.db, id, &req.hospital_id).await? {
        return Err(ApiError::Conflict(
            "hospital already contributed to this study".to_string(),
        ));
    }

    let secret_key: [u8; 32] = hex::decode(&req.statistics.secret_key_hex)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| ApiError::BadRequest("secret_key_hex must be 32 bytes hex".to_string()))?;

    // The witness lives for this call only; nothing raw is stored or logged.
    let witness = PrivateWitnessStore::new(PrivateStatistics {
        patient_count: req.statistics.patient_count,
        treatment_success: req.statistics.treatment_success,
        control_success: req.statistics.control_success,
        control_count: req.statistics.control_count,
        p_value: req.statistics.p_value,
        adverse_events: req.statistics.adverse_events,
        data_quality_score: req.statistics.data_quality_score,
        secret_key,
    })?;

    let salt = req.salt.unwrap_or_else(|| rand::rngs::OsRng.next_u64());

    let meta = StatementMeta {
        study_id: id.to_string(),
        hospital_id: req.hospital_id.clone(),
    };

    let artifact = state
        .assembler
        .assemble(&study.descriptor, &witness, salt, &meta)
        .await?;

    let contribution = artifact.contribution(&req.hospital_id, witness.safety_flag());
    let binding_tag = witness.binding_tag(&req.hospital_id);

    let position =
        db::insert_contribution(&state.db, id, &contribution, &binding_tag, &artifact.proof_b64)
            .await?;

    tracing::info!(
        %id,
        hospital = %req.hospital_id,
        position,
        verified = contribution.verified,
        "contribution recorded"
    );

    Ok(Json(ContributionResponse {
        study_id: id,
        hospital_id: req.hospital_id,
        position,
        commitment_hex: contribution.commitment_hex.clone(),
        proof_hash: contribution.proof_hash.clone(),
        verified: contribution.verified,
        public_signals: contribution.signals,
        efficacy_bucket: contribution.efficacy_bucket,
    }))
}

async fn aggregate_study(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, ApiError> {
    if db::get_study(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("study not found".to_string()));
    }

    // Fixed snapshot in submission order; new contributions require an
    // explicit re-invocation.
    let contributions = db::list_contributions(&state.db, id).await?;

    let quorum = QuorumPolicy {
        min_verified: req.min_verified.unwrap_or(state.quorum.min_verified),
    };
    if !aggregate::meets_quorum(&contributions, &quorum) {
        return Err(ApiError::Conflict(format!(
            "quorum not met: need {} verified contributions",
            quorum.min_verified
        )));
    }

    let result = aggregate::aggregate(
        &id.to_string(),
        &contributions,
        state.assembler.thresholds(),
    );

    let aggregation_id = Uuid::new_v4();
    let created_at = db::insert_aggregation(&state.db, aggregation_id, id, &result).await?;

    tracing::info!(
        %id,
        %aggregation_id,
        included = result.contributions.len(),
        excluded = result.excluded_count,
        "study aggregated"
    );

    Ok(Json(AggregateResponse {
        aggregation_id,
        created_at,
        result,
    }))
}

async fn disclose_study(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DisclosureParams>,
) -> Result<Json<DisclosureView>, ApiError> {
    let Some(study) = db::get_study(&state.db, id).await? else {
        return Err(ApiError::NotFound("study not found".to_string()));
    };

    let Some(result) = db::latest_aggregation(&state.db, id).await? else {
        return Err(ApiError::NotFound(
            "study has no aggregated result yet".to_string(),
        ));
    };

    let context = StudyContext::new(&study.descriptor, study.methodology_hex);
    let view = disclosure::project(&result, &context, params.level);

    Ok(Json(view))
}
