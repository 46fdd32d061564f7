use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::db::store::{
    LedgerSources, PartyDirectory, PricedSale, ProductCatalog, SaleRepository,
};
use crate::error::AppError;
use crate::models::{
    DateRange, DirectEntry, EditLogEntry, Party, PartyRef, PaymentRecord, Product, PurchaseRecord,
    ReturnRecord, Sale, SaleItem, SaleRecord, Totals,
};

/// 销售发票行 (嵌套数据以 JSONB 存储)
#[derive(Debug, FromRow)]
struct SaleRow {
    id: i64,
    invoice_number: String,
    invoice_date: NaiveDate,
    billing_party_id: i64,
    billing_party_name: String,
    items: Json<Vec<SaleItem>>,
    direct_entry: Option<Json<DirectEntry>>,
    discount_percentage: BigDecimal,
    sub_total: BigDecimal,
    discount_amount: BigDecimal,
    taxable_amount: BigDecimal,
    vat_amount: BigDecimal,
    grand_total: BigDecimal,
    note: Option<String>,
    bill_photos: Json<Vec<String>>,
    cancelled: bool,
    edit_history_logs: Json<Vec<EditLogEntry>>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            invoice_number: row.invoice_number,
            invoice_date: row.invoice_date,
            billing_party: PartyRef {
                id: row.billing_party_id,
                name: row.billing_party_name,
            },
            items: row.items.0,
            direct_entry: row.direct_entry.map(|d| d.0),
            discount_percentage: row.discount_percentage,
            totals: Totals {
                sub_total: row.sub_total,
                discount_amount: row.discount_amount,
                taxable_amount: row.taxable_amount,
                vat_amount: row.vat_amount,
                grand_total: row.grand_total,
            },
            note: row.note,
            bill_photos: row.bill_photos.0,
            cancelled: row.cancelled,
            edit_history_logs: row.edit_history_logs.0,
        }
    }
}

/// 查询商品
pub async fn get_product(pool: &PgPool, product_id: i64) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, list_price
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// 查询往来单位
pub async fn get_party(pool: &PgPool, party_id: i64) -> Result<Option<Party>, sqlx::Error> {
    sqlx::query_as::<_, Party>(
        r#"
        SELECT id, name
        FROM parties
        WHERE id = $1
        "#,
    )
    .bind(party_id)
    .fetch_optional(pool)
    .await
}

/// 查询销售发票
pub async fn get_sale(pool: &PgPool, sale_id: i64) -> Result<Option<Sale>, sqlx::Error> {
    let row = sqlx::query_as::<_, SaleRow>(
        r#"
        SELECT s.id, s.invoice_number, s.invoice_date,
               s.billing_party_id, p.name as billing_party_name,
               s.items, s.direct_entry, s.discount_percentage,
               s.sub_total, s.discount_amount, s.taxable_amount, s.vat_amount, s.grand_total,
               s.note, s.bill_photos, s.cancelled, s.edit_history_logs
        FROM sales s
        INNER JOIN parties p ON p.id = s.billing_party_id
        WHERE s.id = $1
        "#,
    )
    .bind(sale_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Sale::from))
}

/// 新增销售发票, 返回新ID
pub async fn insert_sale(pool: &PgPool, sale: &PricedSale) -> Result<i64, sqlx::Error> {
    let req = &sale.request;
    let empty_logs: Vec<EditLogEntry> = Vec::new();

    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO sales (
            invoice_number, invoice_date, billing_party_id,
            items, direct_entry, discount_percentage,
            sub_total, discount_amount, taxable_amount, vat_amount, grand_total,
            note, bill_photos, cancelled, edit_history_logs
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, false, $14)
        RETURNING id
        "#,
    )
    .bind(&req.invoice_number)
    .bind(req.invoice_date)
    .bind(req.billing_party_id)
    .bind(Json(&sale.items))
    .bind(req.direct_entry.as_ref().map(Json))
    .bind(&req.discount_percentage)
    .bind(&sale.totals.sub_total)
    .bind(&sale.totals.discount_amount)
    .bind(&sale.totals.taxable_amount)
    .bind(&sale.totals.vat_amount)
    .bind(&sale.totals.grand_total)
    .bind(&req.note)
    .bind(Json(&req.bill_photos))
    .bind(Json(&empty_logs))
    .fetch_one(pool)
    .await
}

/// 覆盖更新销售发票
pub async fn update_sale(pool: &PgPool, sale: &Sale) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET
            invoice_number = $2,
            invoice_date = $3,
            billing_party_id = $4,
            items = $5,
            direct_entry = $6,
            discount_percentage = $7,
            sub_total = $8,
            discount_amount = $9,
            taxable_amount = $10,
            vat_amount = $11,
            grand_total = $12,
            note = $13,
            bill_photos = $14,
            edit_history_logs = $15
        WHERE id = $1
        "#,
    )
    .bind(sale.id)
    .bind(&sale.invoice_number)
    .bind(sale.invoice_date)
    .bind(sale.billing_party.id)
    .bind(Json(&sale.items))
    .bind(sale.direct_entry.as_ref().map(Json))
    .bind(&sale.discount_percentage)
    .bind(&sale.totals.sub_total)
    .bind(&sale.totals.discount_amount)
    .bind(&sale.totals.taxable_amount)
    .bind(&sale.totals.vat_amount)
    .bind(&sale.totals.grand_total)
    .bind(&sale.note)
    .bind(Json(&sale.bill_photos))
    .bind(Json(&sale.edit_history_logs))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// 台账: 销售 (按开票方)
pub async fn list_party_sales(
    pool: &PgPool,
    party_id: i64,
    range: &DateRange,
) -> Result<Vec<SaleRecord>, sqlx::Error> {
    sqlx::query_as::<_, SaleRecord>(
        r#"
        SELECT id, invoice_number, invoice_date, grand_total, note
        FROM sales
        WHERE billing_party_id = $1
          AND invoice_date BETWEEN $2 AND $3
          AND cancelled = false
        ORDER BY invoice_date, id
        "#,
    )
    .bind(party_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await
}

/// 台账: 采购 (按供应商)
pub async fn list_party_purchases(
    pool: &PgPool,
    party_id: i64,
    range: &DateRange,
) -> Result<Vec<PurchaseRecord>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseRecord>(
        r#"
        SELECT id, bill_number, purchase_date, amount, note
        FROM purchases
        WHERE supplier_id = $1
          AND purchase_date BETWEEN $2 AND $3
          AND cancelled = false
        ORDER BY purchase_date, id
        "#,
    )
    .bind(party_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await
}

/// 台账: 收付款 (按付款方)
pub async fn list_party_payments(
    pool: &PgPool,
    party_id: i64,
    range: &DateRange,
) -> Result<Vec<PaymentRecord>, sqlx::Error> {
    sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT id, receipt_number, payment_date, amount, received_or_paid, payment_mode, note
        FROM payments
        WHERE party_id = $1
          AND payment_date BETWEEN $2 AND $3
          AND cancelled = false
        ORDER BY payment_date, id
        "#,
    )
    .bind(party_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await
}

/// 台账: 退货 (table 为 sales_returns 或 purchase_returns)
async fn list_party_returns(
    pool: &PgPool,
    table: &'static str,
    party_id: i64,
    range: &DateRange,
) -> Result<Vec<ReturnRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT id, return_number, return_date, amount, note
        FROM {}
        WHERE party_id = $1
          AND return_date BETWEEN $2 AND $3
          AND cancelled = false
        ORDER BY return_date, id
        "#,
        table
    );

    sqlx::query_as::<_, ReturnRecord>(&sql)
        .bind(party_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await
}

/// PostgreSQL 存储实现
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductCatalog for PgStore {
    async fn find_product(&self, product_id: i64) -> Result<Option<Product>, AppError> {
        Ok(get_product(&self.pool, product_id).await?)
    }
}

#[async_trait]
impl SaleRepository for PgStore {
    async fn find_sale(&self, sale_id: i64) -> Result<Option<Sale>, AppError> {
        Ok(get_sale(&self.pool, sale_id).await?)
    }

    async fn insert_sale(&self, sale: PricedSale) -> Result<Sale, AppError> {
        if get_party(&self.pool, sale.request.billing_party_id).await?.is_none() {
            return Err(AppError::party_not_found(sale.request.billing_party_id));
        }

        let id = insert_sale(&self.pool, &sale).await?;
        get_sale(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale {} vanished after insert", id)))
    }

    async fn save_sale(&self, sale: &Sale) -> Result<(), AppError> {
        let affected = update_sale(&self.pool, sale).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("Sale {}", sale.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl PartyDirectory for PgStore {
    async fn find_party(&self, party_id: i64) -> Result<Option<Party>, AppError> {
        Ok(get_party(&self.pool, party_id).await?)
    }
}

#[async_trait]
impl LedgerSources for PgStore {
    async fn sales_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<SaleRecord>, AppError> {
        Ok(list_party_sales(&self.pool, party_id, range).await?)
    }

    async fn purchases_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<PurchaseRecord>, AppError> {
        Ok(list_party_purchases(&self.pool, party_id, range).await?)
    }

    async fn payments_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        Ok(list_party_payments(&self.pool, party_id, range).await?)
    }

    async fn sales_returns_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<ReturnRecord>, AppError> {
        Ok(list_party_returns(&self.pool, "sales_returns", party_id, range).await?)
    }

    async fn purchase_returns_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<ReturnRecord>, AppError> {
        Ok(list_party_returns(&self.pool, "purchase_returns", party_id, range).await?)
    }
}
