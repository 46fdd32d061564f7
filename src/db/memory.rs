use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::db::store::{
    LedgerSources, PartyDirectory, PricedSale, ProductCatalog, SaleRepository,
};
use crate::error::AppError;
use crate::models::{
    DateRange, Party, PartyRef, PaymentRecord, Product, PurchaseRecord, ReturnRecord, Sale,
    SaleRecord,
};

/// 带往来单位的台账记录
#[derive(Debug, Clone)]
struct Owned<T> {
    party_id: i64,
    cancelled: bool,
    record: T,
}

/// 内存存储 (测试/演示用), 实现全部存储接口
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    products: DashMap<i64, Product>,
    parties: DashMap<i64, Party>,
    sales: DashMap<i64, Sale>,
    purchases: DashMap<i64, Owned<PurchaseRecord>>,
    payments: DashMap<i64, Owned<PaymentRecord>>,
    sales_returns: DashMap<i64, Owned<ReturnRecord>>,
    purchase_returns: DashMap<i64, Owned<ReturnRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn add_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn add_party(&self, party: Party) {
        self.parties.insert(party.id, party);
    }

    pub fn put_sale(&self, sale: Sale) {
        self.sales.insert(sale.id, sale);
    }

    pub fn sale(&self, sale_id: i64) -> Option<Sale> {
        self.sales.get(&sale_id).map(|s| s.clone())
    }

    pub fn cancel_sale(&self, sale_id: i64) {
        if let Some(mut sale) = self.sales.get_mut(&sale_id) {
            sale.cancelled = true;
        }
    }

    pub fn add_purchase(&self, supplier_id: i64, record: PurchaseRecord, cancelled: bool) {
        self.purchases.insert(
            record.id,
            Owned { party_id: supplier_id, cancelled, record },
        );
    }

    pub fn add_payment(&self, party_id: i64, record: PaymentRecord, cancelled: bool) {
        self.payments.insert(record.id, Owned { party_id, cancelled, record });
    }

    pub fn add_sales_return(&self, party_id: i64, record: ReturnRecord, cancelled: bool) {
        self.sales_returns.insert(record.id, Owned { party_id, cancelled, record });
    }

    pub fn add_purchase_return(&self, party_id: i64, record: ReturnRecord, cancelled: bool) {
        self.purchase_returns.insert(record.id, Owned { party_id, cancelled, record });
    }
}

/// 按往来单位、日期区间筛选未作废记录, 按 (日期, ID) 排序
fn select<T: Clone>(
    map: &DashMap<i64, Owned<T>>,
    party_id: i64,
    range: &DateRange,
    key: impl Fn(&T) -> (chrono::NaiveDate, i64),
) -> Vec<T> {
    let mut out: Vec<T> = map
        .iter()
        .filter(|e| e.party_id == party_id && !e.cancelled && range.contains(key(&e.record).0))
        .map(|e| e.record.clone())
        .collect();
    out.sort_by_key(|r| key(r));
    out
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn find_product(&self, product_id: i64) -> Result<Option<Product>, AppError> {
        Ok(self.products.get(&product_id).map(|p| p.clone()))
    }
}

#[async_trait]
impl SaleRepository for MemoryStore {
    async fn find_sale(&self, sale_id: i64) -> Result<Option<Sale>, AppError> {
        Ok(self.sale(sale_id))
    }

    async fn insert_sale(&self, sale: PricedSale) -> Result<Sale, AppError> {
        let req = sale.request;
        let party = self
            .parties
            .get(&req.billing_party_id)
            .map(|p| p.clone())
            .ok_or_else(|| AppError::party_not_found(req.billing_party_id))?;

        let stored = Sale {
            id: self.allocate_id(),
            invoice_number: req.invoice_number,
            invoice_date: req.invoice_date,
            billing_party: PartyRef { id: party.id, name: party.name },
            items: sale.items,
            direct_entry: req.direct_entry,
            discount_percentage: req.discount_percentage,
            totals: sale.totals,
            note: req.note,
            bill_photos: req.bill_photos,
            cancelled: false,
            edit_history_logs: Vec::new(),
        };
        self.sales.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save_sale(&self, sale: &Sale) -> Result<(), AppError> {
        match self.sales.get_mut(&sale.id) {
            Some(mut slot) => {
                *slot = sale.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Sale {}", sale.id))),
        }
    }
}

#[async_trait]
impl PartyDirectory for MemoryStore {
    async fn find_party(&self, party_id: i64) -> Result<Option<Party>, AppError> {
        Ok(self.parties.get(&party_id).map(|p| p.clone()))
    }
}

#[async_trait]
impl LedgerSources for MemoryStore {
    async fn sales_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<SaleRecord>, AppError> {
        let mut out: Vec<SaleRecord> = self
            .sales
            .iter()
            .filter(|s| {
                s.billing_party.id == party_id && !s.cancelled && range.contains(s.invoice_date)
            })
            .map(|s| SaleRecord {
                id: s.id,
                invoice_number: s.invoice_number.clone(),
                invoice_date: s.invoice_date,
                grand_total: s.totals.grand_total.clone(),
                note: s.note.clone(),
            })
            .collect();
        out.sort_by_key(|s| (s.invoice_date, s.id));
        Ok(out)
    }

    async fn purchases_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<PurchaseRecord>, AppError> {
        Ok(select(&self.purchases, party_id, range, |p| (p.purchase_date, p.id)))
    }

    async fn payments_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        Ok(select(&self.payments, party_id, range, |p| (p.payment_date, p.id)))
    }

    async fn sales_returns_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<ReturnRecord>, AppError> {
        Ok(select(&self.sales_returns, party_id, range, |r| (r.return_date, r.id)))
    }

    async fn purchase_returns_for_party(
        &self,
        party_id: i64,
        range: &DateRange,
    ) -> Result<Vec<ReturnRecord>, AppError> {
        Ok(select(&self.purchase_returns, party_id, range, |r| (r.return_date, r.id)))
    }
}
