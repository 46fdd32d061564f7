pub mod ledger;
pub mod money;
pub mod party;
pub mod product;
pub mod sale;

pub use ledger::{
    BalanceSide, DateRange, LedgerEntry, LedgerRow, LedgerTotals, PartyLedger, PaymentRecord,
    PurchaseRecord, ReturnRecord, SaleRecord, SourceType, DATE_FORMAT,
};
pub use money::{format_money, round_money, zero_money, VatRate};
pub use party::Party;
pub use product::Product;
pub use sale::{
    DirectEntry, EditLogEntry, ItemRequest, NewSale, PartyRef, PricingInput, Sale, SaleItem,
    SalePatch, SaleUpdateRequest, Totals, UpdateOutcome,
};
