use std::io::Write;

use crate::error::AppError;
use crate::models::{format_money, PartyLedger, DATE_FORMAT};

const HEADER: [&str; 8] = [
    "Date",
    "Voucher No",
    "Particulars",
    "Narration",
    "Debit",
    "Credit",
    "Balance",
    "Side",
];

/// 台账导出为 CSV, 末行为合计
pub fn write_ledger_csv<W: Write>(ledger: &PartyLedger, writer: W) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    for row in &ledger.rows {
        wtr.write_record([
            row.date.format(DATE_FORMAT).to_string(),
            row.voucher_number.clone(),
            row.counterparty_label.clone(),
            row.narration.clone(),
            format_money(&row.dr_amount),
            format_money(&row.cr_amount),
            format_money(&row.balance.abs()),
            row.balance_side.label().to_string(),
        ])?;
    }

    let totals = &ledger.totals;
    wtr.write_record([
        String::new(),
        String::new(),
        "Total".to_string(),
        String::new(),
        format_money(&totals.total_debit),
        format_money(&totals.total_credit),
        format_money(&totals.closing_balance.abs()),
        totals.closing_side.label().to_string(),
    ])?;

    wtr.flush()?;
    Ok(())
}

pub fn ledger_csv_bytes(ledger: &PartyLedger) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    write_ledger_csv(ledger, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, LedgerEntry, Party, SaleRecord};
    use crate::service::ledger::{merge_rows, summarize};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[test]
    fn writes_header_rows_and_total() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let rows = merge_rows(vec![LedgerEntry::Sale(SaleRecord {
            id: 1,
            invoice_number: "INV-1".to_string(),
            invoice_date: day,
            grand_total: BigDecimal::from(1130),
            note: Some("Rice, Dal".to_string()),
        })]);
        let totals = summarize(&rows);
        let ledger = PartyLedger {
            party: Party { id: 3, name: "Ram Traders".to_string() },
            range: DateRange::new(day, day).unwrap(),
            rows,
            totals,
        };

        let text = String::from_utf8(ledger_csv_bytes(&ledger).unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Date,Voucher No,Particulars,Narration,Debit,Credit,Balance,Side");
        assert_eq!(lines[1], "2024-02-10,INV-1,Sales,\"Rice, Dal\",1130.00,0.00,1130.00,DR");
        assert_eq!(lines[2], ",,Total,,1130.00,0.00,1130.00,DR");
        assert_eq!(lines.len(), 3);
    }
}
