use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    DateRange, NewSale, Party, PaymentRecord, Product, PurchaseRecord, ReturnRecord, Sale,
    SaleItem, SaleRecord, Totals,
};

/// 商品查询
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_product(&self, product_id: i64) -> Result<Option<Product>, AppError>;
}

/// 已计价、待写入的新发票
#[derive(Debug, Clone)]
pub struct PricedSale {
    pub request: NewSale,
    pub items: Vec<SaleItem>,
    pub totals: Totals,
}

/// 销售发票读写
#[async_trait]
pub trait SaleRepository: Send + Sync {
    async fn find_sale(&self, sale_id: i64) -> Result<Option<Sale>, AppError>;

    async fn insert_sale(&self, sale: PricedSale) -> Result<Sale, AppError>;

    /// 整单覆盖写入 (单文档原子更新, 后写者胜)
    async fn save_sale(&self, sale: &Sale) -> Result<(), AppError>;
}

/// 往来单位查询
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn find_party(&self, party_id: i64) -> Result<Option<Party>, AppError>;
}

/// 台账数据来源, 均排除已作废单据, 按日期+ID升序返回
#[async_trait]
pub trait LedgerSources: PartyDirectory {
    async fn sales_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<SaleRecord>, AppError>;

    async fn purchases_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<PurchaseRecord>, AppError>;

    async fn payments_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<PaymentRecord>, AppError>;

    async fn sales_returns_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<ReturnRecord>, AppError>;

    async fn purchase_returns_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<ReturnRecord>, AppError>;
}

/// 时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟 (测试用)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
