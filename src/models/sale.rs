use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::money::zero_money;

/// 开票方 (往来单位) 引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: i64,
    pub name: String,
}

/// 商品行请求: 商品ID + 数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: i64,
    pub quantity: BigDecimal,
}

/// 已计价的商品行 (rate 不含税)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    pub amount: BigDecimal,
}

/// 直接录入 (与商品行互斥), amount 为含税金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectEntry {
    pub description: String,
    pub amount: BigDecimal,
}

/// 计价输入: 商品行或直接录入金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingInput {
    Items(Vec<ItemRequest>),
    Direct(DirectEntry),
}

/// 发票金额汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub sub_total: BigDecimal,
    pub discount_amount: BigDecimal,
    pub taxable_amount: BigDecimal,
    pub vat_amount: BigDecimal,
    pub grand_total: BigDecimal,
}

impl Default for Totals {
    fn default() -> Self {
        Self {
            sub_total: zero_money(),
            discount_amount: zero_money(),
            taxable_amount: zero_money(),
            vat_amount: zero_money(),
            grand_total: zero_money(),
        }
    }
}

/// 修改记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLogEntry {
    pub description: String,
    pub edited_by: String,
    pub edited_at: DateTime<Utc>,
}

/// 销售发票 (聚合根)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub billing_party: PartyRef,
    pub items: Vec<SaleItem>,
    pub direct_entry: Option<DirectEntry>,
    pub discount_percentage: BigDecimal,
    #[serde(flatten)]
    pub totals: Totals,
    pub note: Option<String>,
    pub bill_photos: Vec<String>,
    pub cancelled: bool,
    pub edit_history_logs: Vec<EditLogEntry>,
}

impl Sale {
    /// 商品行与直接录入必须二选一
    pub fn check_body(&self) -> Result<(), AppError> {
        match (self.items.is_empty(), &self.direct_entry) {
            (false, Some(_)) => Err(AppError::Consistency(format!(
                "Invoice {} has both items and a direct entry",
                self.invoice_number
            ))),
            (true, None) => Err(AppError::Consistency(format!(
                "Invoice {} has neither items nor a direct entry",
                self.invoice_number
            ))),
            _ => Ok(()),
        }
    }

    /// 修改记录按时间倒序 (读取时排序, 存储保持追加顺序)
    pub fn history_latest_first(&self) -> Vec<EditLogEntry> {
        let mut logs = self.edit_history_logs.clone();
        logs.sort_by(|a, b| b.edited_at.cmp(&a.edited_at));
        logs
    }
}

/// 新建发票请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewSale {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub billing_party_id: i64,
    #[serde(default)]
    pub items: Vec<ItemRequest>,
    pub direct_entry: Option<DirectEntry>,
    #[serde(default = "zero_money")]
    pub discount_percentage: BigDecimal,
    pub note: Option<String>,
    #[serde(default)]
    pub bill_photos: Vec<String>,
}

/// 发票修改请求 (None 表示未提交该字段)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SalePatch {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    /// 由服务层根据 billing_party_id 解析填充
    #[serde(skip)]
    pub billing_party: Option<PartyRef>,
    pub items: Option<Vec<ItemRequest>>,
    pub direct_amount: Option<BigDecimal>,
    pub direct_description: Option<String>,
    pub grand_total: Option<BigDecimal>,
    pub discount_percentage: Option<BigDecimal>,
    pub note: Option<String>,
    pub bill_photos: Option<Vec<String>>,
}

/// 修改请求 (HTTP 层): 修改人 + 往来单位ID + 字段
#[derive(Debug, Clone, Deserialize)]
pub struct SaleUpdateRequest {
    pub edited_by: String,
    pub billing_party_id: Option<i64>,
    #[serde(flatten)]
    pub patch: SalePatch,
}

impl SalePatch {
    /// 提交了非空商品行
    pub fn supplied_items(&self) -> Option<&[ItemRequest]> {
        self.items.as_deref().filter(|items| !items.is_empty())
    }
}

/// 修改结果: 已更新 或 无变化
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated {
        sale: Box<Sale>,
        log_entry: EditLogEntry,
    },
    NoChanges,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sale_with(items: Vec<SaleItem>, direct_entry: Option<DirectEntry>) -> Sale {
        Sale {
            id: 1,
            invoice_number: "INV-1".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            billing_party: PartyRef { id: 7, name: "Ram Traders".to_string() },
            items,
            direct_entry,
            discount_percentage: zero_money(),
            totals: Totals::default(),
            note: None,
            bill_photos: vec![],
            cancelled: false,
            edit_history_logs: vec![],
        }
    }

    fn item() -> SaleItem {
        SaleItem {
            product_id: 1,
            product_name: "Rice".to_string(),
            quantity: BigDecimal::from(1),
            rate: BigDecimal::from(100),
            amount: BigDecimal::from(100),
        }
    }

    fn direct() -> DirectEntry {
        DirectEntry { description: "Service".to_string(), amount: BigDecimal::from(500) }
    }

    #[test]
    fn body_must_be_items_xor_direct() {
        assert!(sale_with(vec![item()], None).check_body().is_ok());
        assert!(sale_with(vec![], Some(direct())).check_body().is_ok());
        assert!(matches!(
            sale_with(vec![item()], Some(direct())).check_body(),
            Err(AppError::Consistency(_))
        ));
        assert!(matches!(sale_with(vec![], None).check_body(), Err(AppError::Consistency(_))));
    }

    #[test]
    fn update_request_flattens_patch_fields() {
        let req: SaleUpdateRequest = serde_json::from_str(
            r#"{"edited_by":"admin","billing_party_id":3,"grand_total":"1130","note":"paid"}"#,
        )
        .unwrap();

        assert_eq!(req.edited_by, "admin");
        assert_eq!(req.billing_party_id, Some(3));
        assert_eq!(req.patch.grand_total, Some(BigDecimal::from(1130)));
        assert_eq!(req.patch.note.as_deref(), Some("paid"));
        assert!(req.patch.billing_party.is_none());
        assert!(req.patch.items.is_none());
    }

    #[test]
    fn new_sale_defaults_optional_fields() {
        let sale: NewSale = serde_json::from_str(
            r#"{"invoice_number":"INV-9","invoice_date":"2024-04-01","billing_party_id":1,
                "direct_entry":{"description":"Repair","amount":"565"}}"#,
        )
        .unwrap();

        assert!(sale.items.is_empty());
        assert_eq!(sale.discount_percentage, zero_money());
        assert!(sale.bill_photos.is_empty());
    }

    #[test]
    fn history_reads_latest_first() {
        let mut sale = sale_with(vec![item()], None);
        for day in [1, 3, 2] {
            sale.edit_history_logs.push(EditLogEntry {
                description: format!("edit {}", day),
                edited_by: "admin".to_string(),
                edited_at: Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap(),
            });
        }

        let ordered: Vec<_> = sale.history_latest_first().into_iter().map(|l| l.description).collect();
        assert_eq!(ordered, vec!["edit 3", "edit 2", "edit 1"]);
        // 存储顺序不变
        assert_eq!(sale.edit_history_logs[0].description, "edit 1");
    }
}
