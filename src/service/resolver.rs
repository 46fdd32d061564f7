use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::db::ProductCatalog;
use crate::error::AppError;
use crate::models::{
    round_money, zero_money, DirectEntry, ItemRequest, Sale, SalePatch, UpdateOutcome,
};
use crate::service::differ::diff_sales;
use crate::service::pricing::PricingCalculator;

/// 本次修改涉及的金额重算方式
#[derive(Debug)]
enum Recompute<'a> {
    Items(&'a [ItemRequest]),
    GrandTotal(&'a BigDecimal),
    DirectAmount(&'a BigDecimal),
    Nothing,
}

impl<'a> Recompute<'a> {
    fn from_patch(patch: &'a SalePatch) -> Result<Self, AppError> {
        let direct_supplied = patch.direct_amount.is_some() || patch.grand_total.is_some();

        match (patch.supplied_items(), &patch.grand_total, &patch.direct_amount) {
            (Some(_), _, _) if direct_supplied => Err(AppError::validation(
                "Supply either line items or a direct amount, not both",
            )),
            (Some(items), _, _) => Ok(Recompute::Items(items)),
            (None, Some(_), Some(_)) => Err(AppError::validation(
                "Supply either a direct amount or a grand total, not both",
            )),
            (None, Some(grand_total), None) => Ok(Recompute::GrandTotal(grand_total)),
            (None, None, Some(amount)) => Ok(Recompute::DirectAmount(amount)),
            (None, None, None) => Ok(Recompute::Nothing),
        }
    }
}

/// 销售发票修改解析器
#[derive(Debug, Clone, Default)]
pub struct SaleUpdateResolver {
    pricing: PricingCalculator,
}

impl SaleUpdateResolver {
    pub fn new(pricing: PricingCalculator) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingCalculator {
        &self.pricing
    }

    /// 解析一次修改: 返回更新后的发票及修改记录, 或"无变化"
    ///
    /// 不写库; 调用方只在 `UpdateOutcome::Updated` 时持久化。
    pub async fn resolve_invoice_update(
        &self,
        catalog: &dyn ProductCatalog,
        existing: &Sale,
        patch: &SalePatch,
        editor: &str,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, AppError> {
        if existing.cancelled {
            return Err(AppError::Consistency(format!(
                "Invoice {} is cancelled and cannot be edited",
                existing.invoice_number
            )));
        }
        if editor.trim().is_empty() {
            return Err(AppError::validation("Editor name is required"));
        }
        if let Some(number) = &patch.invoice_number {
            if number.trim().is_empty() {
                return Err(AppError::validation("Invoice number must not be empty"));
            }
        }
        if let Some(discount) = &patch.discount_percentage {
            PricingCalculator::validate_discount(discount)?;
        }
        let recompute = Recompute::from_patch(patch)?;

        let mut after = existing.clone();
        apply_descriptive_fields(&mut after, patch);

        let discount = patch
            .discount_percentage
            .clone()
            .unwrap_or_else(|| existing.discount_percentage.clone());

        match recompute {
            Recompute::Items(requests) => {
                let items = self.pricing.price_items(catalog, requests).await?;
                after.totals = self.pricing.totals_for_items(&items, &discount);
                after.items = items;
                after.direct_entry = None;
                after.discount_percentage = discount;
            }
            Recompute::GrandTotal(grand_total) => {
                let grand_total = round_money(grand_total);
                after.totals = self.pricing.totals_from_grand_total(&grand_total)?;
                after.items.clear();
                after.direct_entry = Some(DirectEntry {
                    description: direct_description(existing, patch),
                    amount: grand_total,
                });
                after.discount_percentage = zero_money();
            }
            Recompute::DirectAmount(amount) => {
                // 先取整再计价, 与新建路径一致
                let amount = round_money(amount);
                after.totals = self.pricing.totals_for_direct(&amount, &discount)?;
                after.items.clear();
                after.direct_entry = Some(DirectEntry {
                    description: direct_description(existing, patch),
                    amount,
                });
                after.discount_percentage = discount;
            }
            Recompute::Nothing => {
                if let (Some(description), Some(entry)) =
                    (&patch.direct_description, after.direct_entry.as_mut())
                {
                    entry.description = description.trim().to_string();
                }
                // 仅修改折扣: 沿用现有小计重算
                if discount != existing.discount_percentage {
                    after.totals = self
                        .pricing
                        .totals_from_sub_total(&existing.totals.sub_total, &discount);
                    after.discount_percentage = discount;
                }
            }
        }

        after.check_body()?;

        match diff_sales(existing, &after, editor, now) {
            None => {
                tracing::warn!(
                    "[SaleUpdate] invoice {}: no changes detected",
                    existing.invoice_number
                );
                Ok(UpdateOutcome::NoChanges)
            }
            Some(log_entry) => {
                tracing::info!(
                    "[SaleUpdate] invoice {}: {}",
                    existing.invoice_number,
                    log_entry.description
                );
                after.edit_history_logs.push(log_entry.clone());
                Ok(UpdateOutcome::Updated {
                    sale: Box::new(after),
                    log_entry,
                })
            }
        }
    }
}

fn apply_descriptive_fields(sale: &mut Sale, patch: &SalePatch) {
    if let Some(number) = &patch.invoice_number {
        sale.invoice_number = number.trim().to_string();
    }
    if let Some(date) = patch.invoice_date {
        sale.invoice_date = date;
    }
    if let Some(party) = &patch.billing_party {
        sale.billing_party = party.clone();
    }
    if let Some(note) = &patch.note {
        let note = note.trim();
        sale.note = (!note.is_empty()).then(|| note.to_string());
    }
    if let Some(photos) = &patch.bill_photos {
        sale.bill_photos = photos.clone();
    }
}

fn direct_description(existing: &Sale, patch: &SalePatch) -> String {
    patch
        .direct_description
        .as_deref()
        .or_else(|| existing.direct_entry.as_ref().map(|d| d.description.as_str()))
        .unwrap_or_default()
        .trim()
        .to_string()
}
