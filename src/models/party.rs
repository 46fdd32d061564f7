use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 往来单位 (客户/供应商)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Party {
    pub id: i64,
    pub name: String,
}
