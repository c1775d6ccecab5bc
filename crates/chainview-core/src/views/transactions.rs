//! Transaction rows for the live table and the transaction detail view.

use std::num::NonZeroUsize;

use serde::Serialize;
use serde_json::Value;

use crate::format::format_timestamp;
use crate::table::{CounterMode, LiveTable, RowNormalizer, TableRenderer, TableRow};
use crate::views::fields::{
    first_array, first_of, operation_label, render_bytes, timestamp_of, to_number, to_text,
    total_output_value,
};

/// Labels shown inline before collapsing the rest into `+N`.
pub const OPERATIONS_PREVIEW_LIMIT: usize = 2;

/// The transactions counter shows every distinct transaction accepted so far,
/// including those already evicted.
pub const COUNTER_MODE: CounterMode = CounterMode::Accepted;

/// Live transactions table with the default field paths.
pub fn live_table<V: TableRenderer<TransactionRow>>(
    capacity: NonZeroUsize,
    renderer: V,
) -> LiveTable<TransactionNormalizer, V> {
    LiveTable::new(capacity, TransactionNormalizer::default(), renderer, COUNTER_MODE)
}

/// Source paths per transaction attribute, highest priority first.
#[derive(Debug, Clone)]
pub struct TransactionFields {
    pub id: Vec<&'static str>,
    pub operations: Vec<&'static str>,
    pub outputs: Vec<&'static str>,
    pub execution_gas_price: Vec<&'static str>,
    pub storage_gas_price: Vec<&'static str>,
}

impl Default for TransactionFields {
    fn default() -> Self {
        Self {
            id: vec!["id"],
            operations: vec!["operations", "ops"],
            outputs: vec!["outputs"],
            execution_gas_price: vec!["execution_gas_price"],
            storage_gas_price: vec!["storage_gas_price"],
        }
    }
}

/// One row of the live transactions table.
///
/// The identity key is the transaction id. Records without an id all share the
/// empty key, so only the first of them is shown until it is evicted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub operations: Vec<String>,
    pub execution_gas_price: f64,
    pub storage_gas_price: f64,
    pub output_count: usize,
    pub total_output_value: f64,
}

impl TransactionRow {
    pub fn operations_preview(&self) -> String {
        operations_preview(&self.operations, OPERATIONS_PREVIEW_LIMIT)
    }
}

impl TableRow for TransactionRow {
    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionNormalizer {
    fields: TransactionFields,
}

impl TransactionNormalizer {
    pub fn new(fields: TransactionFields) -> Self {
        Self { fields }
    }
}

impl RowNormalizer for TransactionNormalizer {
    type Row = TransactionRow;

    fn normalize(&self, raw: &Value) -> TransactionRow {
        let f = &self.fields;
        let id = to_text(first_of(raw, &f.id));
        if id.is_empty() {
            tracing::debug!("transaction record has no id, keyed as empty");
        }
        let outputs = first_array(raw, &f.outputs);
        TransactionRow {
            id,
            operations: operation_labels(first_array(raw, &f.operations)),
            execution_gas_price: to_number(first_of(raw, &f.execution_gas_price)),
            storage_gas_price: to_number(first_of(raw, &f.storage_gas_price)),
            output_count: outputs.len(),
            total_output_value: total_output_value(outputs),
        }
    }
}

pub fn operation_labels(ops: &[Value]) -> Vec<String> {
    ops.iter().map(operation_label).collect()
}

/// `"a, b"` when within `limit`, `"a, b +3"` beyond it, `"—"` when empty.
pub fn operations_preview(labels: &[String], limit: usize) -> String {
    if labels.is_empty() {
        return "—".to_string();
    }
    if labels.len() <= limit {
        return labels.join(", ");
    }
    format!("{} +{}", labels[..limit].join(", "), labels.len() - limit)
}

/// One output note in the ledger section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    pub public_key: String,
    pub value: f64,
}

/// Everything the transaction detail view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetail {
    pub id: String,
    pub block_id: Option<u64>,
    pub hash: String,
    pub proof: String,
    pub operations: Vec<String>,
    pub execution_gas_price: f64,
    pub storage_gas_price: f64,
    pub inputs: Vec<String>,
    pub outputs: Vec<NoteView>,
    pub total_output_value: f64,
    pub timestamp: String,
}

impl TransactionDetail {
    pub fn from_json(raw: &Value) -> Self {
        let fields = TransactionFields::default();
        let outputs = first_array(raw, &fields.outputs);
        Self {
            id: to_text(first_of(raw, &fields.id)),
            block_id: raw.get("block_id").and_then(Value::as_u64),
            hash: render_bytes(raw.get("hash")),
            proof: render_bytes(raw.get("proof")),
            operations: operation_labels(first_array(raw, &fields.operations)),
            execution_gas_price: to_number(first_of(raw, &fields.execution_gas_price)),
            storage_gas_price: to_number(first_of(raw, &fields.storage_gas_price)),
            inputs: first_array(raw, &["inputs"])
                .iter()
                .map(|v| render_bytes(Some(v)))
                .collect(),
            outputs: outputs
                .iter()
                .map(|note| NoteView {
                    public_key: render_bytes(note.get("public_key")),
                    value: to_number(note.get("value")),
                })
                .collect(),
            total_output_value: total_output_value(outputs),
            timestamp: format_timestamp(timestamp_of(raw.get("timestamp"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Quiet;

    impl TableRenderer<TransactionRow> for Quiet {
        fn render_insert(&mut self, _: &TransactionRow) {}
        fn render_evict(&mut self, _: &TransactionRow) {}
        fn render_pad(&mut self, _: usize) {}
        fn render_count(&mut self, _: u64) {}
    }

    #[test]
    fn counter_keeps_evicted_transactions() {
        assert_eq!(COUNTER_MODE, CounterMode::Accepted);
        let mut table = live_table(NonZeroUsize::new(2).unwrap(), Quiet);
        for id in ["a", "b", "c"] {
            table.push_record(&json!({ "id": id }));
        }
        assert_eq!(table.counter(), 3);
        table.push_record(&json!({ "id": "c" }));
        assert_eq!(table.counter(), 3);
        assert_eq!(table.keys(), vec!["c", "b"]);
    }

    #[test]
    fn records_without_id_share_one_row() {
        let mut table = live_table(NonZeroUsize::new(5).unwrap(), Quiet);
        table.push_record(&json!({ "operations": ["Transfer"] }));
        table.push_record(&json!({ "operations": ["Mint"] }));
        assert_eq!(table.displayed_rows(), 1);
        assert_eq!(table.keys(), vec![""]);
        assert_eq!(table.rows().next().unwrap().operations, vec!["Transfer"]);
    }

    fn sample() -> Value {
        json!({
            "id": 77, "block_id": 12, "hash": "0xabc",
            "operations": [
                {"content": {"type": "Transfer"}, "proof": {}},
                {"type": "Mint"},
                "Burn"
            ],
            "inputs": ["0x01", [2, 3]],
            "outputs": [{"value": 5, "public_key": "0xk1"}, {"value": "0x0a", "public_key": [255]}],
            "proof": "0xproof",
            "execution_gas_price": 1500, "storage_gas_price": "25"
        })
    }

    #[test]
    fn row_from_current_schema() {
        let row = TransactionNormalizer::default().normalize(&sample());
        assert_eq!(row.id, "77");
        assert_eq!(row.key(), "77");
        assert_eq!(row.operations, vec!["Transfer", "Mint", "Burn"]);
        assert_eq!(row.execution_gas_price, 1500.0);
        assert_eq!(row.storage_gas_price, 25.0);
        assert_eq!(row.output_count, 2);
        assert_eq!(row.total_output_value, 15.0);
        assert_eq!(row.operations_preview(), "Transfer, Mint +1");
    }

    #[test]
    fn legacy_ops_field() {
        let row = TransactionNormalizer::default().normalize(&json!({"id": "t1", "ops": ["A"]}));
        assert_eq!(row.id, "t1");
        assert_eq!(row.operations_preview(), "A");
    }

    #[test]
    fn empty_record_is_total() {
        let row = TransactionNormalizer::default().normalize(&json!(null));
        assert_eq!(row.id, "");
        assert_eq!(row.operations_preview(), "—");
        assert_eq!(row.total_output_value, 0.0);
    }

    #[test]
    fn preview_limits() {
        let labels: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(operations_preview(&labels, 2), "a, b");
        assert_eq!(operations_preview(&labels, 1), "a +1");
    }

    #[test]
    fn detail() {
        let detail = TransactionDetail::from_json(&sample());
        assert_eq!(detail.block_id, Some(12));
        assert_eq!(detail.proof, "0xproof");
        assert_eq!(detail.inputs, vec!["0x01", "0x0203"]);
        assert_eq!(detail.outputs[1], NoteView { public_key: "0xff".into(), value: 10.0 });
        assert_eq!(detail.total_output_value, 15.0);
        assert_eq!(detail.timestamp, "");
    }
}
