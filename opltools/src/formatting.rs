use order_pipeline_engine::{
    db_types::{MessageRecord, Order, TriggerRecord},
    queue::BatchEntryResult,
    trigger::InvocationReport,
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders found".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row![
        "ID",
        "Order id",
        "Customer id",
        "Items",
        "Total",
        "Status",
        "Payment",
        "Error",
        "Created At",
        "Updated At"
    ]);
    orders.iter().for_each(|order| {
        let items = order.items.as_array().map(|a| a.len().to_string()).unwrap_or_else(|| "?".to_string());
        table.add_row(row![
            order.id,
            order.order_id,
            order.customer_id,
            items,
            format!("{:.2}", order.total_amount),
            order.status.to_string(),
            order.payment_status.to_string(),
            order.error_message.as_deref().unwrap_or_default(),
            order.created_at.to_string(),
            order.updated_at.to_string()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

pub fn format_message_records(records: &[MessageRecord]) -> String {
    if records.is_empty() {
        return "No message records found".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Message id", "Type", "Status", "Order id", "Error", "Processed At"]);
    records.iter().for_each(|r| {
        table.add_row(row![
            r.id,
            r.message_id,
            r.message_type,
            r.status.to_string(),
            r.order_id.as_ref().map(|o| o.to_string()).unwrap_or_default(),
            r.error.as_deref().unwrap_or_default(),
            r.processed_at.to_string()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

pub fn format_triggers(triggers: &[TriggerRecord]) -> String {
    if triggers.is_empty() {
        return "No trigger records found".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["ID", "Message id", "Source", "Event time", "Status", "Order id", "Error"]);
    triggers.iter().for_each(|t| {
        table.add_row(row![
            t.id,
            t.message_id,
            t.event_source,
            t.event_time.to_string(),
            t.status.to_string(),
            t.order_id.as_ref().map(|o| o.to_string()).unwrap_or_default(),
            t.error.as_deref().unwrap_or_default()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}\n")
}

pub fn format_batch_results(results: &[BatchEntryResult]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Entry", "Outcome", "Detail"]);
    results.iter().for_each(|r| match r {
        BatchEntryResult::Sent { id, message_id } => {
            table.add_row(row![id, "sent", message_id]);
        },
        BatchEntryResult::Failed { id, error } => {
            table.add_row(row![id, "failed", error]);
        },
    });
    markdown_style(&mut table);
    let sent = results.iter().filter(|r| r.is_sent()).count();
    format!("{table}\n{sent} of {} orders sent", results.len())
}

pub fn format_report(report: &InvocationReport) -> String {
    let mut f = String::new();
    f.push_str(&format!("Processed: {}\n", report.processed.len()));
    report.processed.iter().for_each(|id| f.push_str(&format!("  {id}\n")));
    f.push_str(&format!("Failed: {}\n", report.failed.len()));
    report.failed.iter().for_each(|id| f.push_str(&format!("  {id}\n")));
    f
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batch_results_table() {
        let results = vec![
            BatchEntryResult::Sent { id: "msg0".into(), message_id: "abc".into() },
            BatchEntryResult::Failed { id: "msg1".into(), error: "Message body is empty".into() },
        ];
        let out = format_batch_results(&results);
        assert!(out.contains("msg0"));
        assert!(out.contains("Message body is empty"));
        assert!(out.ends_with("1 of 2 orders sent"));
    }

    #[test]
    fn empty_lists() {
        assert_eq!(format_orders(&[]), "No orders found");
        assert_eq!(format_message_records(&[]), "No message records found");
        let report = InvocationReport { processed: vec!["a".into()], failed: vec![] };
        assert_eq!(format_report(&report), "Processed: 1\n  a\nFailed: 0\n");
    }
}
