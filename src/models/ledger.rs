use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::money::{round_money, zero_money};
use crate::models::Party;

/// 日期格式 (YYYY-MM-DD)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 查询区间 (闭区间)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// 解析并校验日期区间, 在任何查询之前调用
    pub fn parse(from: &str, to: &str) -> Result<Self, AppError> {
        let parse_one = |label: &str, raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
                AppError::InvalidDateRange(format!(
                    "{} date '{}' is not a valid YYYY-MM-DD date",
                    label, raw
                ))
            })
        };
        let from = parse_one("from", from)?;
        let to = parse_one("to", to)?;
        Self::new(from, to)
    }

    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, AppError> {
        if from > to {
            return Err(AppError::InvalidDateRange(format!(
                "from {} is after to {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// 销售单 (台账视图)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: i64,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub grand_total: BigDecimal,
    pub note: Option<String>,
}

/// 采购单
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: i64,
    pub bill_number: String,
    pub purchase_date: NaiveDate,
    pub amount: BigDecimal,
    pub note: Option<String>,
}

/// 收付款 (received_or_paid = true 表示收到对方款项)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub receipt_number: String,
    pub payment_date: NaiveDate,
    pub amount: BigDecimal,
    pub received_or_paid: bool,
    pub payment_mode: Option<String>,
    pub note: Option<String>,
}

/// 退货单 (销售退货/采购退货共用)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: i64,
    pub return_number: String,
    pub return_date: NaiveDate,
    pub amount: BigDecimal,
    pub note: Option<String>,
}

/// 来源类型, 声明顺序即同日排序优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Sale,
    SalesReturn,
    Purchase,
    PurchaseReturn,
    Payment,
}

/// 余额方向: 贷方余额为正, 借方余额为负
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceSide {
    #[serde(rename = "DR")]
    Dr,
    #[serde(rename = "CR")]
    Cr,
    #[serde(rename = "")]
    Nil,
}

impl BalanceSide {
    pub fn of(balance: &BigDecimal) -> Self {
        if balance > &BigDecimal::zero() {
            BalanceSide::Cr
        } else if balance < &BigDecimal::zero() {
            BalanceSide::Dr
        } else {
            BalanceSide::Nil
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BalanceSide::Dr => "DR",
            BalanceSide::Cr => "CR",
            BalanceSide::Nil => "",
        }
    }
}

/// 台账行 (只读投影, 不落库)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub voucher_number: String,
    pub counterparty_label: String,
    pub narration: String,
    pub dr_amount: BigDecimal,
    pub cr_amount: BigDecimal,
    pub source_type: SourceType,
    pub balance: BigDecimal,
    pub balance_side: BalanceSide,
}

/// 各来源交易, 统一投影为台账行
#[derive(Debug, Clone)]
pub enum LedgerEntry {
    Sale(SaleRecord),
    SalesReturn(ReturnRecord),
    Purchase(PurchaseRecord),
    PurchaseReturn(ReturnRecord),
    Payment(PaymentRecord),
}

impl LedgerEntry {
    pub fn source_type(&self) -> SourceType {
        match self {
            LedgerEntry::Sale(_) => SourceType::Sale,
            LedgerEntry::SalesReturn(_) => SourceType::SalesReturn,
            LedgerEntry::Purchase(_) => SourceType::Purchase,
            LedgerEntry::PurchaseReturn(_) => SourceType::PurchaseReturn,
            LedgerEntry::Payment(_) => SourceType::Payment,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            LedgerEntry::Sale(s) => s.invoice_date,
            LedgerEntry::SalesReturn(r) | LedgerEntry::PurchaseReturn(r) => r.return_date,
            LedgerEntry::Purchase(p) => p.purchase_date,
            LedgerEntry::Payment(p) => p.payment_date,
        }
    }

    /// 投影为台账行, balance 由聚合器回填
    pub fn to_row(&self) -> LedgerRow {
        let (voucher_number, counterparty_label, narration, dr_amount, cr_amount) = match self {
            LedgerEntry::Sale(s) => (
                s.invoice_number.clone(),
                "Sales".to_string(),
                narration_or(&s.note, || format!("Sales invoice {}", s.invoice_number)),
                round_money(&s.grand_total),
                zero_money(),
            ),
            LedgerEntry::SalesReturn(r) => (
                r.return_number.clone(),
                "Sales Return".to_string(),
                narration_or(&r.note, || format!("Sales return {}", r.return_number)),
                zero_money(),
                round_money(&r.amount),
            ),
            LedgerEntry::Purchase(p) => (
                p.bill_number.clone(),
                "Purchase".to_string(),
                narration_or(&p.note, || format!("Purchase bill {}", p.bill_number)),
                zero_money(),
                round_money(&p.amount),
            ),
            LedgerEntry::PurchaseReturn(r) => (
                r.return_number.clone(),
                "Purchase Return".to_string(),
                narration_or(&r.note, || format!("Purchase return {}", r.return_number)),
                round_money(&r.amount),
                zero_money(),
            ),
            LedgerEntry::Payment(p) => {
                let mode = p.payment_mode.as_deref().unwrap_or("cash");
                if p.received_or_paid {
                    (
                        p.receipt_number.clone(),
                        "Payment Received".to_string(),
                        narration_or(&p.note, || format!("Received by {}", mode)),
                        zero_money(),
                        round_money(&p.amount),
                    )
                } else {
                    (
                        p.receipt_number.clone(),
                        "Payment Made".to_string(),
                        narration_or(&p.note, || format!("Paid by {}", mode)),
                        round_money(&p.amount),
                        zero_money(),
                    )
                }
            }
        };

        LedgerRow {
            date: self.date(),
            voucher_number,
            counterparty_label,
            narration,
            dr_amount,
            cr_amount,
            source_type: self.source_type(),
            balance: zero_money(),
            balance_side: BalanceSide::Nil,
        }
    }
}

fn narration_or(note: &Option<String>, fallback: impl FnOnce() -> String) -> String {
    match note.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => fallback(),
    }
}

/// 期间合计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total_sales: BigDecimal,
    pub total_sales_returns: BigDecimal,
    pub total_purchases: BigDecimal,
    pub total_purchase_returns: BigDecimal,
    pub total_payments_received: BigDecimal,
    pub total_payments_made: BigDecimal,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub closing_balance: BigDecimal,
    pub closing_side: BalanceSide,
}

/// 往来单位台账
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyLedger {
    pub party: Party,
    pub range: DateRange,
    pub rows: Vec<LedgerRow>,
    pub totals: LedgerTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_and_validates_range() {
        let range = DateRange::parse("2024-01-01", "2024-03-31").unwrap();
        assert!(range.contains(d(2024, 1, 1)));
        assert!(range.contains(d(2024, 3, 31)));
        assert!(!range.contains(d(2024, 4, 1)));

        assert!(matches!(
            DateRange::parse("2024-13-01", "2024-03-31"),
            Err(AppError::InvalidDateRange(_))
        ));
        assert!(matches!(
            DateRange::parse("2024-03-01", "yesterday"),
            Err(AppError::InvalidDateRange(_))
        ));
        assert!(matches!(
            DateRange::parse("2024-03-31", "2024-03-01"),
            Err(AppError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn payment_direction_decides_column() {
        let mut payment = PaymentRecord {
            id: 1,
            receipt_number: "RCPT-1".to_string(),
            payment_date: d(2024, 2, 1),
            amount: BigDecimal::from(300),
            received_or_paid: true,
            payment_mode: Some("bank".to_string()),
            note: None,
        };

        let received = LedgerEntry::Payment(payment.clone()).to_row();
        assert_eq!(received.cr_amount, BigDecimal::from(300));
        assert_eq!(received.dr_amount, BigDecimal::zero());
        assert_eq!(received.counterparty_label, "Payment Received");
        assert_eq!(received.narration, "Received by bank");

        payment.received_or_paid = false;
        let paid = LedgerEntry::Payment(payment).to_row();
        assert_eq!(paid.dr_amount, BigDecimal::from(300));
        assert_eq!(paid.cr_amount, BigDecimal::zero());
    }

    #[test]
    fn returns_reverse_their_original_side() {
        let record = ReturnRecord {
            id: 9,
            return_number: "RET-9".to_string(),
            return_date: d(2024, 2, 2),
            amount: BigDecimal::from(50),
            note: Some("  damaged goods ".to_string()),
        };

        let sales_return = LedgerEntry::SalesReturn(record.clone()).to_row();
        assert_eq!(sales_return.cr_amount, BigDecimal::from(50));
        assert_eq!(sales_return.narration, "damaged goods");

        let purchase_return = LedgerEntry::PurchaseReturn(record).to_row();
        assert_eq!(purchase_return.dr_amount, BigDecimal::from(50));
    }

    #[test]
    fn balance_side_labels() {
        assert_eq!(BalanceSide::of(&BigDecimal::from(-5)).label(), "DR");
        assert_eq!(BalanceSide::of(&BigDecimal::from(5)).label(), "CR");
        assert_eq!(BalanceSide::of(&BigDecimal::zero()).label(), "");
    }
}
