use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::models::{format_money, EditLogEntry, Sale, SaleItem, DATE_FORMAT};

/// 比较修改前后的发票, 生成一条可读的修改记录; 无变化返回 None
pub fn diff_sales(
    before: &Sale,
    after: &Sale,
    editor: &str,
    now: DateTime<Utc>,
) -> Option<EditLogEntry> {
    let clauses = collect_clauses(before, after);
    if clauses.is_empty() {
        return None;
    }

    Some(EditLogEntry {
        description: format!("{} changed {}", editor, clauses.join(", ")),
        edited_by: editor.to_string(),
        edited_at: now,
    })
}

fn collect_clauses(before: &Sale, after: &Sale) -> Vec<String> {
    let mut clauses = Vec::new();

    if before.invoice_number != after.invoice_number {
        clauses.push(change("Invoice Number", &before.invoice_number, &after.invoice_number));
    }

    if before.invoice_date != after.invoice_date {
        clauses.push(change(
            "Invoice Date",
            &before.invoice_date.format(DATE_FORMAT).to_string(),
            &after.invoice_date.format(DATE_FORMAT).to_string(),
        ));
    }

    if before.billing_party.id != after.billing_party.id {
        clauses.push(change(
            "Billing Party",
            &before.billing_party.name,
            &after.billing_party.name,
        ));
    }

    if before.items.len() != after.items.len() {
        clauses.push(change(
            "Items",
            &before.items.len().to_string(),
            &after.items.len().to_string(),
        ));
    } else if !same_items(&before.items, &after.items) {
        clauses.push("Items modified".to_string());
    }

    let before_amount = before.direct_entry.as_ref().map(|d| &d.amount);
    let after_amount = after.direct_entry.as_ref().map(|d| &d.amount);
    if before_amount != after_amount {
        clauses.push(change(
            "Direct Amount",
            &money_or_none(before_amount),
            &money_or_none(after_amount),
        ));
    }

    let before_desc = before.direct_entry.as_ref().map(|d| d.description.trim());
    let after_desc = after.direct_entry.as_ref().map(|d| d.description.trim());
    if before_desc.is_some() && after_desc.is_some() && before_desc != after_desc {
        clauses.push(change(
            "Description",
            before_desc.unwrap_or_default(),
            after_desc.unwrap_or_default(),
        ));
    }

    let before_note = text(&before.note);
    let after_note = text(&after.note);
    if before_note != after_note {
        clauses.push(change(
            "Note",
            before_note.unwrap_or("none"),
            after_note.unwrap_or("none"),
        ));
    }

    if before.discount_percentage != after.discount_percentage {
        clauses.push(change(
            "Discount Percentage",
            &format_money(&before.discount_percentage),
            &format_money(&after.discount_percentage),
        ));
    }

    if before.totals.grand_total != after.totals.grand_total {
        clauses.push(change(
            "Grand Total",
            &format_money(&before.totals.grand_total),
            &format_money(&after.totals.grand_total),
        ));
    }

    if before.bill_photos.len() != after.bill_photos.len() {
        clauses.push(change(
            "Bill Photos",
            &before.bill_photos.len().to_string(),
            &after.bill_photos.len().to_string(),
        ));
    } else if before.bill_photos != after.bill_photos {
        clauses.push("Bill Photos replaced".to_string());
    }

    clauses
}

fn change(label: &str, from: &str, to: &str) -> String {
    format!("{} from {} to {}", label, from, to)
}

fn money_or_none(value: Option<&BigDecimal>) -> String {
    value.map(format_money).unwrap_or_else(|| "none".to_string())
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn same_items(a: &[SaleItem], b: &[SaleItem]) -> bool {
    a.iter().zip(b).all(|(x, y)| {
        x.product_id == y.product_id && x.quantity == y.quantity && x.amount == y.amount
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DirectEntry, PartyRef, Totals};
    use chrono::{NaiveDate, TimeZone};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn base() -> Sale {
        Sale {
            id: 1,
            invoice_number: "INV-100".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            billing_party: PartyRef { id: 7, name: "Ram Traders".to_string() },
            items: vec![],
            direct_entry: Some(DirectEntry {
                description: "Consulting".to_string(),
                amount: dec("1130"),
            }),
            discount_percentage: dec("0"),
            totals: Totals { grand_total: dec("1130.00"), ..Totals::default() },
            note: None,
            bill_photos: vec![],
            cancelled: false,
            edit_history_logs: vec![],
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn identical_snapshots_produce_no_entry() {
        assert!(diff_sales(&base(), &base(), "admin", now()).is_none());
    }

    #[test]
    fn scale_only_differences_are_not_changes() {
        let mut after = base();
        after.totals.grand_total = dec("1130");
        after.discount_percentage = dec("0.00");
        after.note = Some("   ".to_string());
        assert!(diff_sales(&base(), &after, "admin", now()).is_none());
    }

    #[test]
    fn each_changed_field_adds_one_clause() {
        let mut after = base();
        after.invoice_number = "INV-101".to_string();
        after.billing_party = PartyRef { id: 8, name: "Sita Stores".to_string() };
        after.totals.grand_total = dec("1200");
        after.bill_photos = vec!["bill-1.jpg".to_string()];

        let entry = diff_sales(&base(), &after, "admin", now()).unwrap();
        assert_eq!(
            entry.description,
            "admin changed Invoice Number from INV-100 to INV-101, \
             Billing Party from Ram Traders to Sita Stores, \
             Grand Total from 1130.00 to 1200.00, \
             Bill Photos from 0 to 1"
        );
        assert_eq!(entry.edited_by, "admin");
        assert_eq!(entry.edited_at, now());
    }

    #[test]
    fn switching_modes_reports_items_and_direct_amount() {
        let mut after = base();
        after.direct_entry = None;
        after.items = vec![SaleItem {
            product_id: 3,
            product_name: "Cement".to_string(),
            quantity: dec("2"),
            rate: dec("500"),
            amount: dec("1000"),
        }];

        let entry = diff_sales(&base(), &after, "ram", now()).unwrap();
        assert!(entry.description.contains("Items from 0 to 1"));
        assert!(entry.description.contains("Direct Amount from 1130.00 to none"));
    }

    #[test]
    fn date_and_note_are_rendered_readably() {
        let mut after = base();
        after.invoice_date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        after.note = Some("deliver friday".to_string());

        let entry = diff_sales(&base(), &after, "admin", now()).unwrap();
        assert_eq!(
            entry.description,
            "admin changed Invoice Date from 2024-04-01 to 2024-04-05, Note from none to deliver friday"
        );
    }
}
