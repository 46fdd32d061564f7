use bigdecimal::{BigDecimal, One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 金额小数位数
pub const MONEY_SCALE: i64 = 2;

/// 金额统一保留两位小数 (四舍五入, 远离零)
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.round(MONEY_SCALE).with_scale(MONEY_SCALE)
}

/// 两位小数的零
pub fn zero_money() -> BigDecimal {
    BigDecimal::zero().with_scale(MONEY_SCALE)
}

/// 展示用金额字符串, 例如 "1000.00"
pub fn format_money(value: &BigDecimal) -> String {
    round_money(value).to_string()
}

/// 增值税税率 (系统级配置, 默认 13%)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VatRate(BigDecimal);

impl VatRate {
    pub fn new(rate: BigDecimal) -> Result<Self, AppError> {
        if rate < BigDecimal::zero() || rate >= BigDecimal::one() {
            return Err(AppError::validation(format!(
                "VAT rate must be within [0, 1), got {}",
                rate
            )));
        }
        Ok(Self(rate))
    }

    pub fn rate(&self) -> &BigDecimal {
        &self.0
    }

    /// 1 + 税率
    pub fn divisor(&self) -> BigDecimal {
        BigDecimal::one() + &self.0
    }

    /// 含税金额反算不含税金额 (已取整)
    pub fn exclusive_of(&self, inclusive: &BigDecimal) -> BigDecimal {
        round_money(&(inclusive / self.divisor()))
    }

    /// 计税金额对应的税额 (已取整)
    pub fn vat_on(&self, taxable: &BigDecimal) -> BigDecimal {
        round_money(&(taxable * &self.0))
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self(BigDecimal::from(13) / BigDecimal::from(100))
    }
}
