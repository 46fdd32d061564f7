use bigdecimal::{BigDecimal, Zero};
use futures::future::try_join_all;
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashMap;

use crate::db::ProductCatalog;
use crate::error::AppError;
use crate::models::{round_money, ItemRequest, PricingInput, Product, SaleItem, Totals, VatRate};

/// 计价结果: 商品行 (直接录入时为空) + 金额汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedInvoice {
    pub items: Vec<SaleItem>,
    pub totals: Totals,
}

/// 发票计价器
///
/// 所有写入金额字段的值都只在各自公式的最终结果上取整一次;
/// 唯一的中间取整是商品的不含税单价 (rate)。
#[derive(Debug, Clone, Default)]
pub struct PricingCalculator {
    vat: VatRate,
}

impl PricingCalculator {
    pub fn new(vat: VatRate) -> Self {
        Self { vat }
    }

    pub fn vat(&self) -> &VatRate {
        &self.vat
    }

    /// 折扣百分比必须在 [0, 100]
    pub fn validate_discount(discount_percentage: &BigDecimal) -> Result<(), AppError> {
        if discount_percentage < &BigDecimal::zero() || discount_percentage > &BigDecimal::from(100) {
            return Err(AppError::validation(format!(
                "Discount percentage must be between 0 and 100, got {}",
                discount_percentage
            )));
        }
        Ok(())
    }

    /// 计算发票金额 (商品行或直接录入)
    pub async fn compute_invoice_totals(
        &self,
        catalog: &dyn ProductCatalog,
        input: &PricingInput,
        discount_percentage: &BigDecimal,
    ) -> Result<PricedInvoice, AppError> {
        Self::validate_discount(discount_percentage)?;

        match input {
            PricingInput::Items(requests) => {
                let items = self.price_items(catalog, requests).await?;
                let totals = self.totals_for_items(&items, discount_percentage);
                tracing::info!(
                    "[Pricing] {} items priced, grand total {}",
                    items.len(),
                    totals.grand_total
                );
                Ok(PricedInvoice { items, totals })
            }
            PricingInput::Direct(entry) => {
                let totals = self.totals_for_direct(&entry.amount, discount_percentage)?;
                tracing::info!(
                    "[Pricing] direct entry {} priced, grand total {}",
                    entry.amount,
                    totals.grand_total
                );
                Ok(PricedInvoice {
                    items: Vec::new(),
                    totals,
                })
            }
        }
    }

    /// 查询商品并计算每行金额; 任一商品不存在则整体失败
    pub async fn price_items(
        &self,
        catalog: &dyn ProductCatalog,
        requests: &[ItemRequest],
    ) -> Result<Vec<SaleItem>, AppError> {
        if requests.is_empty() {
            return Err(AppError::validation("At least one line item is required"));
        }
        if let Some(bad) = requests.iter().find(|r| r.quantity <= BigDecimal::zero()) {
            return Err(AppError::validation(format!(
                "Quantity for product {} must be positive, got {}",
                bad.product_id, bad.quantity
            )));
        }

        // 保序去重后并发查询
        let product_ids: IndexSet<i64> = requests.iter().map(|r| r.product_id).collect();
        let found = try_join_all(product_ids.iter().map(|&id| catalog.find_product(id))).await?;

        let mut products: HashMap<i64, Product> = HashMap::with_capacity(product_ids.len());
        for (id, product) in product_ids.iter().zip(found) {
            match product {
                Some(p) => {
                    products.insert(*id, p);
                }
                None => {
                    tracing::warn!("[Pricing] product {} not found, aborting invoice", id);
                    return Err(AppError::product_not_found(*id));
                }
            }
        }

        let items = requests
            .iter()
            .filter_map(|req| products.get(&req.product_id).map(|p| self.price_line(p, req)))
            .collect();
        Ok(items)
    }

    fn price_line(&self, product: &Product, req: &ItemRequest) -> SaleItem {
        let rate = self.vat.exclusive_of(&product.list_price);
        let amount = round_money(&(&rate * &req.quantity));
        tracing::debug!(
            "[Pricing] product {} x {} @ {} = {}",
            product.id,
            req.quantity,
            rate,
            amount
        );
        SaleItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: req.quantity.clone(),
            rate,
            amount,
        }
    }

    /// 商品行模式: 小计 = 各行金额之和
    pub fn totals_for_items(&self, items: &[SaleItem], discount_percentage: &BigDecimal) -> Totals {
        let sum = items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.amount);
        self.totals_from_sub_total(&sum, discount_percentage)
    }

    /// 直接录入模式: 含税金额先反算并取整为小计, 再计算折扣
    pub fn totals_for_direct(
        &self,
        amount: &BigDecimal,
        discount_percentage: &BigDecimal,
    ) -> Result<Totals, AppError> {
        if amount < &BigDecimal::zero() {
            return Err(AppError::validation(format!(
                "Direct entry amount must not be negative, got {}",
                amount
            )));
        }
        // 录入金额先按分取整
        let sub_total = self.vat.exclusive_of(&round_money(amount));
        Ok(self.totals_from_sub_total(&sub_total, discount_percentage))
    }

    /// 由不含税小计推导折扣、计税金额、税额、总额
    pub fn totals_from_sub_total(&self, sub_total: &BigDecimal, discount_percentage: &BigDecimal) -> Totals {
        let sub_total = round_money(sub_total);
        let discount_amount =
            round_money(&(&sub_total * discount_percentage / BigDecimal::from(100)));
        let taxable_amount = round_money(&(&sub_total - &discount_amount));
        let vat_amount = self.vat.vat_on(&taxable_amount);
        let grand_total = round_money(&(&taxable_amount + &vat_amount));

        Totals {
            sub_total,
            discount_amount,
            taxable_amount,
            vat_amount,
            grand_total,
        }
    }

    /// 直接指定含税总额: 反算计税金额和税额, 折扣为零
    pub fn totals_from_grand_total(&self, grand_total: &BigDecimal) -> Result<Totals, AppError> {
        if grand_total < &BigDecimal::zero() {
            return Err(AppError::validation(format!(
                "Grand total must not be negative, got {}",
                grand_total
            )));
        }
        let grand_total = round_money(grand_total);
        let taxable_amount = self.vat.exclusive_of(&grand_total);
        let vat_amount = round_money(&(&grand_total - &taxable_amount));

        Ok(Totals {
            sub_total: taxable_amount.clone(),
            discount_amount: round_money(&BigDecimal::zero()),
            grand_total: round_money(&(&taxable_amount + &vat_amount)),
            taxable_amount,
            vat_amount,
        })
    }
}
