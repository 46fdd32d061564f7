use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::db::{Clock, PartyDirectory, PricedSale, ProductCatalog, SaleRepository};
use crate::error::AppError;
use crate::models::{
    round_money, EditLogEntry, NewSale, PartyRef, PricingInput, Sale, SaleUpdateRequest,
    UpdateOutcome,
};
use crate::service::pricing::{PricedInvoice, PricingCalculator};
use crate::service::resolver::SaleUpdateResolver;

/// 销售发票服务: 计价、新建、修改、修改记录
pub struct SaleService {
    sales: Arc<dyn SaleRepository>,
    catalog: Arc<dyn ProductCatalog>,
    parties: Arc<dyn PartyDirectory>,
    clock: Arc<dyn Clock>,
    resolver: SaleUpdateResolver,
}

impl SaleService {
    pub fn new(
        sales: Arc<dyn SaleRepository>,
        catalog: Arc<dyn ProductCatalog>,
        parties: Arc<dyn PartyDirectory>,
        clock: Arc<dyn Clock>,
        pricing: PricingCalculator,
    ) -> Self {
        Self {
            sales,
            catalog,
            parties,
            clock,
            resolver: SaleUpdateResolver::new(pricing),
        }
    }

    fn pricing(&self) -> &PricingCalculator {
        self.resolver.pricing()
    }

    /// 仅计算金额, 不写库
    pub async fn compute_totals(
        &self,
        input: &PricingInput,
        discount_percentage: &BigDecimal,
    ) -> Result<PricedInvoice, AppError> {
        self.pricing()
            .compute_invoice_totals(self.catalog.as_ref(), input, discount_percentage)
            .await
    }

    /// 新建发票: 校验 -> 计价 -> 写入
    pub async fn create_sale(&self, mut request: NewSale) -> Result<Sale, AppError> {
        if request.invoice_number.trim().is_empty() {
            return Err(AppError::validation("Invoice number is required"));
        }
        // 直接录入金额入库前取整, 与修改路径一致
        if let Some(entry) = request.direct_entry.as_mut() {
            entry.amount = round_money(&entry.amount);
        }

        let input = match (request.items.is_empty(), &request.direct_entry) {
            (false, Some(_)) => {
                return Err(AppError::validation(
                    "An invoice takes either line items or a direct entry, not both",
                ))
            }
            (true, None) => {
                return Err(AppError::validation(
                    "An invoice needs line items or a direct entry",
                ))
            }
            (false, None) => PricingInput::Items(request.items.clone()),
            (true, Some(entry)) => PricingInput::Direct(entry.clone()),
        };

        let priced = self
            .compute_totals(&input, &request.discount_percentage)
            .await?;

        let sale = self
            .sales
            .insert_sale(PricedSale {
                request,
                items: priced.items,
                totals: priced.totals,
            })
            .await?;
        sale.check_body()?;

        tracing::info!(
            "[Sale] invoice {} created for {}, grand total {}",
            sale.invoice_number,
            sale.billing_party.name,
            sale.totals.grand_total
        );
        Ok(sale)
    }

    /// 修改发票; 无变化时不写库、不记日志
    pub async fn update_sale(
        &self,
        sale_id: i64,
        request: SaleUpdateRequest,
    ) -> Result<UpdateOutcome, AppError> {
        let existing = self
            .sales
            .find_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale {}", sale_id)))?;

        let mut patch = request.patch;
        if let Some(party_id) = request.billing_party_id {
            let party = self
                .parties
                .find_party(party_id)
                .await?
                .ok_or_else(|| AppError::party_not_found(party_id))?;
            patch.billing_party = Some(PartyRef {
                id: party.id,
                name: party.name,
            });
        }

        let outcome = self
            .resolver
            .resolve_invoice_update(
                self.catalog.as_ref(),
                &existing,
                &patch,
                &request.edited_by,
                self.clock.now(),
            )
            .await?;

        if let UpdateOutcome::Updated { sale, .. } = &outcome {
            self.sales.save_sale(sale).await?;
        }
        Ok(outcome)
    }

    /// 修改记录 (最新在前)
    pub async fn history(&self, sale_id: i64) -> Result<Vec<EditLogEntry>, AppError> {
        let sale = self
            .sales
            .find_sale(sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sale {}", sale_id)))?;
        Ok(sale.history_latest_first())
    }
}
