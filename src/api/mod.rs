pub mod handlers;

pub use handlers::{
    compute_totals, create_sale, health_check, party_ledger, party_ledger_csv, sale_history,
    update_sale,
};
