pub mod differ;
pub mod export;
pub mod ledger;
pub mod pricing;
pub mod resolver;
pub mod sales;

pub use differ::diff_sales;
pub use export::{ledger_csv_bytes, write_ledger_csv};
pub use ledger::LedgerAggregator;
pub use pricing::{PricedInvoice, PricingCalculator};
pub use resolver::SaleUpdateResolver;
pub use sales::SaleService;
