//! Block rows for the live table and the block detail view.

use std::num::NonZeroUsize;

use serde::Serialize;
use serde_json::Value;

use crate::format::format_timestamp;
use crate::table::{CounterMode, LiveTable, RowNormalizer, TableRenderer, TableRow};
use crate::views::fields::{
    first_array, first_of, render_bytes, timestamp_of, to_text, to_u64, total_output_value,
};
use crate::views::transactions::operation_labels;

/// The blocks counter shows how many rows are on screen.
pub const COUNTER_MODE: CounterMode = CounterMode::Held;

/// Live blocks table with the default field paths.
pub fn live_table<V: TableRenderer<BlockRow>>(
    capacity: NonZeroUsize,
    renderer: V,
) -> LiveTable<BlockNormalizer, V> {
    LiveTable::new(capacity, BlockNormalizer::default(), renderer, COUNTER_MODE)
}

/// Source paths per block attribute, highest priority first.
#[derive(Debug, Clone)]
pub struct BlockFields {
    pub id: Vec<&'static str>,
    pub slot: Vec<&'static str>,
    pub hash: Vec<&'static str>,
    pub parent: Vec<&'static str>,
    pub root: Vec<&'static str>,
    pub transactions: Vec<&'static str>,
}

impl Default for BlockFields {
    fn default() -> Self {
        Self {
            id: vec!["id"],
            slot: vec!["slot", "header.slot"],
            hash: vec!["hash", "header.hash"],
            parent: vec!["parent_block_hash", "header.parent_block", "parent_block"],
            root: vec!["block_root", "header.block_root"],
            transactions: vec!["transactions", "txs"],
        }
    }
}

/// One row of the live blocks table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRow {
    pub id: u64,
    pub slot: u64,
    pub hash: String,
    pub parent: String,
    pub root: String,
    pub transaction_count: usize,
}

impl TableRow for BlockRow {
    fn key(&self) -> String {
        format!("{}:{}", self.id, self.slot)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockNormalizer {
    fields: BlockFields,
}

impl BlockNormalizer {
    pub fn new(fields: BlockFields) -> Self {
        Self { fields }
    }
}

impl RowNormalizer for BlockNormalizer {
    type Row = BlockRow;

    fn normalize(&self, raw: &Value) -> BlockRow {
        let f = &self.fields;
        BlockRow {
            id: to_u64(first_of(raw, &f.id)),
            slot: to_u64(first_of(raw, &f.slot)),
            hash: render_bytes(first_of(raw, &f.hash)),
            parent: render_bytes(first_of(raw, &f.parent)),
            root: render_bytes(first_of(raw, &f.root)),
            transaction_count: first_array(raw, &f.transactions).len(),
        }
    }
}

/// Compact transaction line inside a block detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockTransactionSummary {
    pub id: String,
    pub output_count: usize,
    pub total_output_value: f64,
    pub execution_gas_price: u64,
    pub storage_gas_price: u64,
    pub operations: Vec<String>,
}

/// Everything the block detail view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDetail {
    pub id: u64,
    pub slot: Option<u64>,
    pub hash: String,
    pub root: String,
    /// Set when the backend links the parent by id; otherwise show `parent_hash`.
    pub parent_id: Option<u64>,
    pub parent_hash: String,
    /// Local time, empty when the backend sent none.
    pub timestamp: String,
    pub transactions: Vec<BlockTransactionSummary>,
}

impl BlockDetail {
    pub fn from_json(raw: &Value) -> Self {
        let fields = BlockFields::default();
        let transactions = first_array(raw, &fields.transactions)
            .iter()
            .map(|tx| {
                let outputs = first_array(tx, &["outputs"]);
                BlockTransactionSummary {
                    id: to_text(tx.get("id")),
                    output_count: outputs.len(),
                    total_output_value: total_output_value(outputs),
                    execution_gas_price: to_u64(tx.get("execution_gas_price")),
                    storage_gas_price: to_u64(tx.get("storage_gas_price")),
                    operations: operation_labels(first_array(tx, &["operations", "ops"])),
                }
            })
            .collect();

        Self {
            id: to_u64(first_of(raw, &fields.id)),
            slot: first_of(raw, &fields.slot).map(|v| to_u64(Some(v))),
            hash: render_bytes(first_of(raw, &fields.hash)),
            root: render_bytes(first_of(raw, &fields.root)),
            parent_id: raw.get("parent_id").and_then(Value::as_u64),
            parent_hash: render_bytes(first_of(raw, &fields.parent)),
            timestamp: format_timestamp(timestamp_of(first_of(
                raw,
                &["timestamp", "header.timestamp"],
            ))),
            transactions,
        }
    }
}
