use bigdecimal::{BigDecimal, Zero};
use std::sync::Arc;

use crate::db::LedgerSources;
use crate::error::AppError;
use crate::models::{
    round_money, BalanceSide, DateRange, LedgerEntry, LedgerRow, LedgerTotals, PartyLedger,
    SourceType,
};

/// 往来单位台账聚合
pub struct LedgerAggregator {
    sources: Arc<dyn LedgerSources>,
}

impl LedgerAggregator {
    pub fn new(sources: Arc<dyn LedgerSources>) -> Self {
        Self { sources }
    }

    /// 台账入口: 先校验日期, 再查询
    pub async fn build_party_ledger(
        &self,
        party_id: i64,
        from: &str,
        to: &str,
    ) -> Result<PartyLedger, AppError> {
        let range = DateRange::parse(from, to)?;
        self.build_ledger(party_id, range).await
    }

    pub async fn build_ledger(
        &self,
        party_id: i64,
        range: DateRange,
    ) -> Result<PartyLedger, AppError> {
        let party = self
            .sources
            .find_party(party_id)
            .await?
            .ok_or_else(|| AppError::party_not_found(party_id))?;

        // 各来源互不依赖, 并发查询
        let (sales, purchases, payments, sales_returns, purchase_returns) = futures::try_join!(
            self.sources.sales_for_party(party_id, &range),
            self.sources.purchases_for_party(party_id, &range),
            self.sources.payments_for_party(party_id, &range),
            self.sources.sales_returns_for_party(party_id, &range),
            self.sources.purchase_returns_for_party(party_id, &range),
        )?;

        tracing::debug!(
            "[Ledger] party {}: {} sales, {} purchases, {} payments, {} sales returns, {} purchase returns",
            party_id,
            sales.len(),
            purchases.len(),
            payments.len(),
            sales_returns.len(),
            purchase_returns.len()
        );

        let entries: Vec<LedgerEntry> = sales
            .into_iter()
            .map(LedgerEntry::Sale)
            .chain(sales_returns.into_iter().map(LedgerEntry::SalesReturn))
            .chain(purchases.into_iter().map(LedgerEntry::Purchase))
            .chain(purchase_returns.into_iter().map(LedgerEntry::PurchaseReturn))
            .chain(payments.into_iter().map(LedgerEntry::Payment))
            .collect();

        if entries.is_empty() {
            tracing::warn!(
                "[Ledger] party {}: no transactions between {} and {}",
                party_id,
                range.from,
                range.to
            );
            return Err(AppError::NoTransactions {
                party_id,
                from: range.from.to_string(),
                to: range.to.to_string(),
            });
        }

        let rows = merge_rows(entries);
        let totals = summarize(&rows);

        tracing::info!(
            "[Ledger] party {} ({}): {} rows, closing balance {} {}",
            party.id,
            party.name,
            rows.len(),
            totals.closing_balance,
            totals.closing_side.label()
        );

        Ok(PartyLedger {
            party,
            range,
            rows,
            totals,
        })
    }
}

/// 合并排序并计算滚动余额
///
/// 排序键: 日期升序, 同日按来源类型 (销售, 销售退货, 采购, 采购退货, 收付款),
/// 同类型保持来源返回顺序 (日期+ID)。balance += cr - dr。
pub fn merge_rows(entries: Vec<LedgerEntry>) -> Vec<LedgerRow> {
    let mut rows: Vec<LedgerRow> = entries.iter().map(LedgerEntry::to_row).collect();
    rows.sort_by_key(|r| (r.date, r.source_type));

    let mut balance = BigDecimal::zero();
    for row in rows.iter_mut() {
        balance = &balance + &row.cr_amount - &row.dr_amount;
        row.balance = round_money(&balance);
        row.balance_side = BalanceSide::of(&balance);
    }
    rows
}

/// 期间合计 (按来源独立汇总, 与滚动余额无关)
pub fn summarize(rows: &[LedgerRow]) -> LedgerTotals {
    let sum_where = |source: SourceType, pick: fn(&LedgerRow) -> &BigDecimal| {
        let total = rows
            .iter()
            .filter(|r| r.source_type == source)
            .fold(BigDecimal::zero(), |acc, r| acc + pick(r));
        round_money(&total)
    };
    fn dr(r: &LedgerRow) -> &BigDecimal {
        &r.dr_amount
    }
    fn cr(r: &LedgerRow) -> &BigDecimal {
        &r.cr_amount
    }

    let total_debit = rows
        .iter()
        .fold(BigDecimal::zero(), |acc, r| acc + &r.dr_amount);
    let total_credit = rows
        .iter()
        .fold(BigDecimal::zero(), |acc, r| acc + &r.cr_amount);
    let closing_balance = &total_credit - &total_debit;

    LedgerTotals {
        total_sales: sum_where(SourceType::Sale, dr),
        total_sales_returns: sum_where(SourceType::SalesReturn, cr),
        total_purchases: sum_where(SourceType::Purchase, cr),
        total_purchase_returns: sum_where(SourceType::PurchaseReturn, dr),
        total_payments_received: sum_where(SourceType::Payment, cr),
        total_payments_made: sum_where(SourceType::Payment, dr),
        total_debit: round_money(&total_debit),
        total_credit: round_money(&total_credit),
        closing_side: BalanceSide::of(&closing_balance),
        closing_balance: round_money(&closing_balance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentRecord, PurchaseRecord, SaleRecord};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn sale(id: i64, day: u32, total: i64) -> LedgerEntry {
        LedgerEntry::Sale(SaleRecord {
            id,
            invoice_number: format!("INV-{}", id),
            invoice_date: d(day),
            grand_total: BigDecimal::from(total),
            note: None,
        })
    }

    fn purchase(id: i64, day: u32, amount: i64) -> LedgerEntry {
        LedgerEntry::Purchase(PurchaseRecord {
            id,
            bill_number: format!("PB-{}", id),
            purchase_date: d(day),
            amount: BigDecimal::from(amount),
            note: None,
        })
    }

    fn payment(id: i64, day: u32, amount: i64, received: bool) -> LedgerEntry {
        LedgerEntry::Payment(PaymentRecord {
            id,
            receipt_number: format!("RC-{}", id),
            payment_date: d(day),
            amount: BigDecimal::from(amount),
            received_or_paid: received,
            payment_mode: None,
            note: None,
        })
    }

    #[test]
    fn same_day_rows_follow_source_priority() {
        // 故意乱序输入
        let rows = merge_rows(vec![
            payment(1, 5, 100, true),
            purchase(2, 5, 200),
            sale(3, 5, 300),
            sale(4, 4, 50),
        ]);
        let order: Vec<_> = rows.iter().map(|r| r.voucher_number.as_str()).collect();
        assert_eq!(order, vec!["INV-4", "INV-3", "PB-2", "RC-1"]);
    }

    #[test]
    fn same_source_same_day_keeps_fetch_order() {
        let rows = merge_rows(vec![sale(9, 1, 10), sale(2, 1, 20)]);
        assert_eq!(rows[0].voucher_number, "INV-9");
        assert_eq!(rows[1].voucher_number, "INV-2");
    }

    #[test]
    fn totals_are_independent_of_running_balance() {
        let rows = merge_rows(vec![
            sale(1, 1, 1000),
            purchase(2, 2, 400),
            payment(3, 3, 300, true),
            payment(4, 4, 50, false),
        ]);
        let totals = summarize(&rows);

        assert_eq!(totals.total_sales, BigDecimal::from(1000));
        assert_eq!(totals.total_purchases, BigDecimal::from(400));
        assert_eq!(totals.total_payments_received, BigDecimal::from(300));
        assert_eq!(totals.total_payments_made, BigDecimal::from(50));
        assert_eq!(totals.total_debit, BigDecimal::from(1050));
        assert_eq!(totals.total_credit, BigDecimal::from(700));
        assert_eq!(totals.closing_balance, BigDecimal::from(-350));
        assert_eq!(totals.closing_side, BalanceSide::Dr);
        assert_eq!(rows.last().unwrap().balance, totals.closing_balance);
    }
}
