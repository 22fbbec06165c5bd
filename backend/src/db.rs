use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use trial_proofs::aggregate::AggregatedResult;
use trial_proofs::artifact::HospitalContribution;
use trial_proofs::descriptor::StudyDescriptor;
use uuid::Uuid;

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .map_err(|_| ApiError::Internal)
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // NOTE: Keep schema minimal and explicit. Studies and aggregations are
    // append-only; contributions are one per (study, hospital).
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS studies (
  id TEXT PRIMARY KEY,
  created_at TEXT NOT NULL,
  descriptor_json TEXT NOT NULL,
  fingerprint_hex TEXT NOT NULL,
  methodology_hex TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contributions (
  study_id TEXT NOT NULL,
  hospital_id TEXT NOT NULL,
  position INTEGER NOT NULL,
  created_at TEXT NOT NULL,
  contribution_json TEXT NOT NULL,
  binding_tag TEXT NOT NULL,
  proof_b64 TEXT NOT NULL,
  verified INTEGER NOT NULL,
  PRIMARY KEY(study_id, hospital_id)
);

CREATE TABLE IF NOT EXISTS aggregations (
  id TEXT PRIMARY KEY,
  study_id TEXT NOT NULL,
  created_at TEXT NOT NULL,
  result_json TEXT NOT NULL
);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

pub async fn insert_study(
    db: &Db,
    study_id: Uuid,
    descriptor: &StudyDescriptor,
    fingerprint_hex: &str,
    methodology_hex: &str,
) -> Result<(), ApiError> {
    let created_at = Utc::now().to_rfc3339();
    let descriptor_json = serde_json::to_string(descriptor).map_err(|_| ApiError::Internal)?;

    sqlx::query(
        r#"INSERT INTO studies (id, created_at, descriptor_json, fingerprint_hex, methodology_hex)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(study_id.to_string())
    .bind(created_at)
    .bind(descriptor_json)
    .bind(fingerprint_hex)
    .bind(methodology_hex)
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

pub struct StudyRow {
    pub created_at: DateTime<Utc>,
    pub descriptor: StudyDescriptor,
    pub fingerprint_hex: String,
    pub methodology_hex: String,
}

pub async fn get_study(db: &Db, study_id: Uuid) -> Result<Option<StudyRow>, ApiError> {
    let row = sqlx::query(
        r#"SELECT created_at, descriptor_json, fingerprint_hex, methodology_hex
           FROM studies WHERE id = ?"#,
    )
    .bind(study_id.to_string())
    .fetch_optional(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let Some(row) = row else { return Ok(None) };

    let created_at: String = row.get(0);
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| ApiError::Internal)?
        .with_timezone(&Utc);

    let descriptor_json: String = row.get(1);
    let descriptor: StudyDescriptor =
        serde_json::from_str(&descriptor_json).map_err(|_| ApiError::Internal)?;

    Ok(Some(StudyRow {
        created_at,
        descriptor,
        fingerprint_hex: row.get(2),
        methodology_hex: row.get(3),
    }))
}

pub async fn contribution_exists(
    db: &Db,
    study_id: Uuid,
    hospital_id: &str,
) -> Result<bool, ApiError> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS c FROM contributions WHERE study_id = ? AND hospital_id = ?"#,
    )
    .bind(study_id.to_string())
    .bind(hospital_id)
    .fetch_one(db)
    .await
    .map_err(|_| ApiError::Internal)?;
    let c: i64 = row.get("c");
    Ok(c > 0)
}

/// Insert a contribution at the next submission position.
pub async fn insert_contribution(
    db: &Db,
    study_id: Uuid,
    contribution: &HospitalContribution,
    binding_tag: &str,
    proof_b64: &str,
) -> Result<u64, ApiError> {
    let created_at = Utc::now().to_rfc3339();
    let contribution_json = serde_json::to_string(contribution).map_err(|_| ApiError::Internal)?;

    let row = sqlx::query(r#"SELECT COUNT(*) AS c FROM contributions WHERE study_id = ?"#)
        .bind(study_id.to_string())
        .fetch_one(db)
        .await
        .map_err(|_| ApiError::Internal)?;
    let position: i64 = row.get("c");

    sqlx::query(
        r#"INSERT INTO contributions
           (study_id, hospital_id, position, created_at, contribution_json, binding_tag, proof_b64, verified)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(study_id.to_string())
    .bind(&contribution.hospital_id)
    .bind(position)
    .bind(created_at)
    .bind(contribution_json)
    .bind(binding_tag)
    .bind(proof_b64)
    .bind(if contribution.verified { 1i64 } else { 0i64 })
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(position as u64)
}

/// Snapshot of a study's contributions in submission order.
pub async fn list_contributions(
    db: &Db,
    study_id: Uuid,
) -> Result<Vec<HospitalContribution>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT contribution_json FROM contributions
           WHERE study_id = ?
           ORDER BY position"#,
    )
    .bind(study_id.to_string())
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let contribution_json: String = row.get(0);
        let contribution: HospitalContribution =
            serde_json::from_str(&contribution_json).map_err(|_| ApiError::Internal)?;
        out.push(contribution);
    }

    Ok(out)
}

pub async fn count_contributions(db: &Db, study_id: Uuid) -> Result<(u64, u64), ApiError> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS total, COALESCE(SUM(verified), 0) AS verified
           FROM contributions WHERE study_id = ?"#,
    )
    .bind(study_id.to_string())
    .fetch_one(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let total: i64 = row.get("total");
    let verified: i64 = row.get("verified");
    Ok((total as u64, verified as u64))
}

pub async fn insert_aggregation(
    db: &Db,
    aggregation_id: Uuid,
    study_id: Uuid,
    result: &AggregatedResult,
) -> Result<DateTime<Utc>, ApiError> {
    let created_at = Utc::now();
    let result_json = serde_json::to_string(result).map_err(|_| ApiError::Internal)?;

    sqlx::query(
        r#"INSERT INTO aggregations (id, study_id, created_at, result_json)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(aggregation_id.to_string())
    .bind(study_id.to_string())
    .bind(created_at.to_rfc3339())
    .bind(result_json)
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(created_at)
}

pub async fn latest_aggregation(
    db: &Db,
    study_id: Uuid,
) -> Result<Option<AggregatedResult>, ApiError> {
    let row = sqlx::query(
        r#"SELECT result_json FROM aggregations
           WHERE study_id = ?
           ORDER BY created_at DESC, rowid DESC
           LIMIT 1"#,
    )
    .bind(study_id.to_string())
    .fetch_optional(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let Some(row) = row else { return Ok(None) };

    let result_json: String = row.get(0);
    let result: AggregatedResult =
        serde_json::from_str(&result_json).map_err(|_| ApiError::Internal)?;
    Ok(Some(result))
}
