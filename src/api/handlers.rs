use crate::error::AppError;
use crate::models::{
    zero_money, EditLogEntry, NewSale, PartyLedger, PricingInput, Sale, SaleUpdateRequest,
    UpdateOutcome,
};
use crate::service::{ledger_csv_bytes, LedgerAggregator, PricedInvoice, SaleService};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 计价输入 + 折扣
#[derive(Debug, Deserialize)]
pub struct ComputeTotalsRequest {
    pub input: PricingInput,
    #[serde(default = "zero_money")]
    pub discount_percentage: BigDecimal,
}

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale: Option<Sale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_entry: Option<EditLogEntry>,
}

/// 台账查询参数
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub from: String,
    pub to: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 计价预览
pub async fn compute_totals(
    State(service): State<Arc<SaleService>>,
    Json(req): Json<ComputeTotalsRequest>,
) -> Result<Json<PricedInvoice>, AppError> {
    let priced = service
        .compute_totals(&req.input, &req.discount_percentage)
        .await?;
    Ok(Json(priced))
}

/// 新建发票
pub async fn create_sale(
    State(service): State<Arc<SaleService>>,
    Json(req): Json<NewSale>,
) -> Result<Response, AppError> {
    let sale = service.create_sale(req).await?;
    let response = SaleResponse {
        success: true,
        message: format!("Invoice {} created", sale.invoice_number),
        sale: Some(sale),
        log_entry: None,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// 修改发票
pub async fn update_sale(
    State(service): State<Arc<SaleService>>,
    Path(sale_id): Path<i64>,
    Json(req): Json<SaleUpdateRequest>,
) -> Result<Json<SaleResponse>, AppError> {
    let response = match service.update_sale(sale_id, req).await? {
        UpdateOutcome::Updated { sale, log_entry } => SaleResponse {
            success: true,
            message: log_entry.description.clone(),
            sale: Some(*sale),
            log_entry: Some(log_entry),
        },
        UpdateOutcome::NoChanges => SaleResponse {
            success: true,
            message: "No changes detected".to_string(),
            sale: None,
            log_entry: None,
        },
    };
    Ok(Json(response))
}

/// 修改记录 (最新在前)
pub async fn sale_history(
    State(service): State<Arc<SaleService>>,
    Path(sale_id): Path<i64>,
) -> Result<Json<Vec<EditLogEntry>>, AppError> {
    Ok(Json(service.history(sale_id).await?))
}

/// 往来单位台账
pub async fn party_ledger(
    State(aggregator): State<Arc<LedgerAggregator>>,
    Path(party_id): Path<i64>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<PartyLedger>, AppError> {
    let ledger = aggregator
        .build_party_ledger(party_id, &query.from, &query.to)
        .await?;
    Ok(Json(ledger))
}

/// 往来单位台账导出 (CSV)
pub async fn party_ledger_csv(
    State(aggregator): State<Arc<LedgerAggregator>>,
    Path(party_id): Path<i64>,
    Query(query): Query<LedgerQuery>,
) -> Result<Response, AppError> {
    let ledger = aggregator
        .build_party_ledger(party_id, &query.from, &query.to)
        .await?;
    let body = ledger_csv_bytes(&ledger)?;
    let filename = format!(
        "attachment; filename=\"ledger-{}-{}-{}.csv\"",
        party_id, query.from, query.to
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    )
        .into_response())
}
