#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, TimeZone, Utc};
use std::str::FromStr;
use std::sync::Arc;

use vat_ledger_rust::db::{FixedClock, MemoryStore};
use vat_ledger_rust::models::{
    DirectEntry, ItemRequest, NewSale, Party, PartyRef, PaymentRecord, Product, PurchaseRecord,
    ReturnRecord, Sale, Totals,
};
use vat_ledger_rust::{LedgerAggregator, PricingCalculator, SaleService};

pub const PARTY_ID: i64 = 1;
pub const OTHER_PARTY_ID: i64 = 2;
pub const RICE: i64 = 10;
pub const DAL: i64 = 11;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 预置两个往来单位和两个商品
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_party(Party { id: PARTY_ID, name: "Ram Traders".to_string() });
    store.add_party(Party { id: OTHER_PARTY_ID, name: "Sita Suppliers".to_string() });
    store.add_product(Product { id: RICE, name: "Rice".to_string(), list_price: dec("113") });
    store.add_product(Product { id: DAL, name: "Dal".to_string(), list_price: dec("100") });
    store
}

pub fn sale_service(store: &Arc<MemoryStore>) -> SaleService {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
    SaleService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(clock),
        PricingCalculator::default(),
    )
}

pub fn ledger(store: &Arc<MemoryStore>) -> LedgerAggregator {
    LedgerAggregator::new(store.clone())
}

pub fn item(product_id: i64, quantity: &str) -> ItemRequest {
    ItemRequest { product_id, quantity: dec(quantity) }
}

pub fn items_sale(number: &str, on: NaiveDate, items: Vec<ItemRequest>) -> NewSale {
    NewSale {
        invoice_number: number.to_string(),
        invoice_date: on,
        billing_party_id: PARTY_ID,
        items,
        direct_entry: None,
        discount_percentage: dec("0"),
        note: None,
        bill_photos: vec![],
    }
}

pub fn direct_sale(number: &str, on: NaiveDate, amount: &str) -> NewSale {
    NewSale {
        invoice_number: number.to_string(),
        invoice_date: on,
        billing_party_id: PARTY_ID,
        items: vec![],
        direct_entry: Some(DirectEntry {
            description: "Consulting".to_string(),
            amount: dec(amount),
        }),
        discount_percentage: dec("0"),
        note: None,
        bill_photos: vec![],
    }
}

pub fn purchase(id: i64, on: NaiveDate, amount: &str) -> PurchaseRecord {
    PurchaseRecord {
        id,
        bill_number: format!("PB-{}", id),
        purchase_date: on,
        amount: dec(amount),
        note: None,
    }
}

pub fn payment(id: i64, on: NaiveDate, amount: &str, received: bool) -> PaymentRecord {
    PaymentRecord {
        id,
        receipt_number: format!("RC-{}", id),
        payment_date: on,
        amount: dec(amount),
        received_or_paid: received,
        payment_mode: Some("bank".to_string()),
        note: None,
    }
}

pub fn sale_return(id: i64, on: NaiveDate, amount: &str) -> ReturnRecord {
    ReturnRecord {
        id,
        return_number: format!("SR-{}", id),
        return_date: on,
        amount: dec(amount),
        note: None,
    }
}

/// 直接写入一张指定总额的发票 (绕过计价)
pub fn seed_sale(store: &MemoryStore, id: i64, on: NaiveDate, grand_total: &str) -> Sale {
    let sale = Sale {
        id,
        invoice_number: format!("INV-{}", id),
        invoice_date: on,
        billing_party: PartyRef { id: PARTY_ID, name: "Ram Traders".to_string() },
        items: vec![],
        direct_entry: Some(DirectEntry {
            description: "Opening".to_string(),
            amount: dec(grand_total),
        }),
        discount_percentage: dec("0"),
        totals: Totals { grand_total: dec(grand_total), ..Totals::default() },
        note: None,
        bill_photos: vec![],
        cancelled: false,
        edit_history_logs: vec![],
    };
    store.put_sale(sale.clone());
    sale
}

pub fn purchase_return(id: i64, on: NaiveDate, amount: &str) -> ReturnRecord {
    ReturnRecord {
        id,
        return_number: format!("PR-{}", id),
        return_date: on,
        amount: dec(amount),
        note: None,
    }
}
