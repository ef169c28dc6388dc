//! HTTP处理器

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use clinic_core::{AdmitRequest, BloodGroup, ClinicError};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;

/// 守卫错误到HTTP状态码的映射
pub struct ApiError(ClinicError);

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::OverrideSuspended(_) => StatusCode::CONFLICT,
            ClinicError::InvalidState(_) | ClinicError::InvalidStateTransition { .. } => {
                StatusCode::CONFLICT
            }
            ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// 从请求头提取操作者身份（不做校验，仅透传）
fn operator_from(headers: &HeaderMap) -> String {
    headers
        .get("x-operator")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Clinic Flow API",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "api": "/api/v1"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": "1.0.0"
    }))
}

/// 系统概览
pub async fn get_overview(State(state): State<AppState>) -> impl IntoResponse {
    let overview = state.engine.read().await.overview();
    Json(overview)
}

/// 候诊队列投影
pub async fn get_queue(State(state): State<AppState>) -> impl IntoResponse {
    let tokens = state.engine.read().await.pending_tokens();
    let total = tokens.len();
    Json(json!({ "tokens": tokens, "total": total }))
}

/// 在诊会话投影
pub async fn get_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.engine.read().await.active_sessions();
    let total = sessions.len();
    Json(json!({ "sessions": sessions, "total": total }))
}

/// 在诊会话进度投影
pub async fn get_session_progress(State(state): State<AppState>) -> impl IntoResponse {
    let progress = state.engine.read().await.session_progress();
    let total = progress.len();
    Json(json!({ "sessions": progress, "total": total }))
}

/// 完成历史投影（最近优先）
pub async fn get_history(State(state): State<AppState>) -> impl IntoResponse {
    let records = state.engine.read().await.completed_history();
    let total = records.len();
    Json(json!({ "records": records, "total": total }))
}

/// 转急诊令牌投影
pub async fn get_escalated(State(state): State<AppState>) -> impl IntoResponse {
    let tokens = state.engine.read().await.escalated_tokens();
    let total = tokens.len();
    Json(json!({ "tokens": tokens, "total": total }))
}

/// 受理请求体
#[derive(Debug, Deserialize)]
pub struct AdmitBody {
    pub patient_name: String,
    pub assigned_doctor: String,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub estimated_wait_minutes: Option<i64>,
}

/// 受理新令牌
pub async fn admit_token(
    State(state): State<AppState>,
    Json(body): Json<AdmitBody>,
) -> ApiResult<impl IntoResponse> {
    let request = AdmitRequest {
        patient_name: body.patient_name,
        assigned_doctor: body.assigned_doctor,
        scheduled_time: body.scheduled_time.unwrap_or_else(Utc::now),
        estimated_wait_minutes: body.estimated_wait_minutes.unwrap_or(15),
    };

    let token = state.engine.write().await.admit_token(request)?;
    state.persist().await;

    info!("Admitted token {} via API", token.label());
    Ok((StatusCode::CREATED, Json(token)))
}

/// 叫号就诊
pub async fn approve_token(
    State(state): State<AppState>,
    Path(token_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let session = state.engine.write().await.approve_token(token_id)?;
    state.persist().await;
    Ok(Json(session))
}

/// 改约
pub async fn reschedule_token(
    State(state): State<AppState>,
    Path(token_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let token = state.engine.write().await.reschedule_token(token_id)?;
    state.persist().await;
    Ok(Json(token))
}

/// 完成请求体
#[derive(Debug, Deserialize)]
pub struct FinalizeBody {
    pub elapsed_seconds: u64,
    pub notes: Option<String>,
}

/// 就诊完成
pub async fn finalize_session(
    State(state): State<AppState>,
    Path(token_id): Path<Uuid>,
    Json(body): Json<FinalizeBody>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .engine
        .write()
        .await
        .finalize_session(token_id, body.elapsed_seconds, body.notes)?;
    state.persist().await;
    Ok(Json(record))
}

/// 转急诊
pub async fn escalate_session(
    State(state): State<AppState>,
    Path(token_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let token = state.engine.write().await.escalate_session(token_id)?;
    state.persist().await;
    Ok(Json(token))
}

/// 应急预案状态查询
pub async fn get_protocol(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.engine.read().await.override_active();
    Json(json!({ "active": active }))
}

/// 应急预案请求体
#[derive(Debug, Deserialize)]
pub struct ProtocolBody {
    pub active: bool,
}

/// 启动/解除应急预案（幂等）
pub async fn put_protocol(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ProtocolBody>,
) -> ApiResult<impl IntoResponse> {
    let operator = operator_from(&headers);

    let changed = {
        let mut engine = state.engine.write().await;
        if body.active {
            engine.activate_override(&operator)
        } else {
            engine.deactivate_override()
        }
    };
    state.persist().await;

    Ok(Json(json!({ "active": body.active, "changed": changed })))
}

/// 预期时长请求体
#[derive(Debug, Deserialize)]
pub struct ExpectedDurationBody {
    pub seconds: u64,
}

/// 配置医生预期问诊时长
pub async fn put_expected_duration(
    State(state): State<AppState>,
    Path(doctor_name): Path<String>,
    Json(body): Json<ExpectedDurationBody>,
) -> ApiResult<impl IntoResponse> {
    if body.seconds == 0 {
        return Err(ClinicError::Validation("seconds must be positive".to_string()).into());
    }

    state
        .engine
        .write()
        .await
        .set_expected_duration(&doctor_name, body.seconds);
    Ok(Json(json!({ "doctor": doctor_name, "seconds": body.seconds })))
}

/// 血液请求查询参数
#[derive(Debug, Deserialize)]
pub struct BloodQueryParams {
    pub facility: Option<String>,
}

/// 待应答血液请求投影
pub async fn get_blood_requests(
    State(state): State<AppState>,
    Query(params): Query<BloodQueryParams>,
) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let requests = match params.facility.as_deref() {
        Some(facility) => engine.blood_outstanding_for(facility),
        None => engine.blood_pending(),
    };
    let total = requests.len();
    Json(json!({ "requests": requests, "total": total }))
}

/// 血液请求历史投影
pub async fn get_blood_history(State(state): State<AppState>) -> impl IntoResponse {
    let requests = state.engine.read().await.blood_history();
    let total = requests.len();
    Json(json!({ "requests": requests, "total": total }))
}

/// 血液请求体
#[derive(Debug, Deserialize)]
pub struct BloodPostBody {
    pub blood_group: BloodGroup,
    pub units: u32,
    pub requested_by: String,
    /// 指定目标机构时为定向请求，否则为社区广播
    pub facility: Option<String>,
}

/// 发起血液请求
pub async fn post_blood_request(
    State(state): State<AppState>,
    Json(body): Json<BloodPostBody>,
) -> ApiResult<impl IntoResponse> {
    let request = {
        let mut engine = state.engine.write().await;
        match body.facility.as_deref() {
            Some(facility) => engine.post_blood_direct(
                body.blood_group,
                body.units,
                &body.requested_by,
                facility,
            )?,
            None => engine.post_blood_broadcast(body.blood_group, body.units, &body.requested_by)?,
        }
    };
    Ok((StatusCode::CREATED, Json(request)))
}

/// 血液应答请求体
#[derive(Debug, Deserialize)]
pub struct BloodRespondBody {
    pub facility: String,
}

/// 应答血液请求
pub async fn acknowledge_blood(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<BloodRespondBody>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .engine
        .write()
        .await
        .acknowledge_blood(request_id, &body.facility)?;
    Ok(Json(request))
}

/// 婉拒定向血液请求
pub async fn decline_blood(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<BloodRespondBody>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .engine
        .write()
        .await
        .decline_blood(request_id, &body.facility)?;
    Ok(Json(request))
}

/// 完成血液调配
pub async fn fulfill_blood(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<BloodRespondBody>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .engine
        .write()
        .await
        .fulfill_blood(request_id, &body.facility)?;
    Ok(Json(request))
}
