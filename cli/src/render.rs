//! Terminal renderers for the live views and the detail pages.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::marker::PhantomData;

use serde::Serialize;

use chainview_core::format::{format_amount, short_hex};
use chainview_core::views::blocks::BlockDetail;
use chainview_core::views::transactions::{operations_preview, TransactionDetail};
use chainview_core::views::{BlockRow, TransactionRow};
use chainview_core::{HealthStatus, TableRenderer, TableRow};

const PLACEHOLDER: &str = "  ·";

/// Fixed-width terminal line for one row type.
pub trait RowFormat: TableRow + Serialize {
    const TITLE: &'static str;
    const COUNTER_LABEL: &'static str;

    fn header() -> String;
    fn line(&self) -> String;
}

impl RowFormat for BlockRow {
    const TITLE: &'static str = "Blocks";
    const COUNTER_LABEL: &'static str = "shown";

    fn header() -> String {
        format!(
            "{:>8}  {:>10}  {:<19}  {:<19}  {:>3}",
            "ID", "SLOT", "HASH", "PARENT", "TXS"
        )
    }

    fn line(&self) -> String {
        format!(
            "{:>8}  {:>10}  {:<19}  {:<19}  {:>3}",
            self.id,
            self.slot,
            short_hex(&self.hash),
            short_hex(&self.parent),
            self.transaction_count
        )
    }
}

impl RowFormat for TransactionRow {
    const TITLE: &'static str = "Transactions";
    const COUNTER_LABEL: &'static str = "seen";

    fn header() -> String {
        format!(
            "{:<19}  {:<28}  {:>12}  {:>12}  {:>4}  {:>14}",
            "ID", "OPERATIONS", "EXEC GAS", "STORAGE GAS", "OUTS", "OUTPUT TOTAL"
        )
    }

    fn line(&self) -> String {
        format!(
            "{:<19}  {:<28}  {:>12}  {:>12}  {:>4}  {:>14}",
            short_hex(&self.id),
            self.operations_preview(),
            format_amount(self.execution_gas_price),
            format_amount(self.storage_gas_price),
            self.output_count,
            format_amount(self.total_output_value)
        )
    }
}

/// Mirrors a live table on stdout and redraws it after every update.
///
/// In JSON mode each inserted row is printed as one JSON line instead.
pub struct TerminalTable<R> {
    json: bool,
    lines: VecDeque<String>,
    placeholders: usize,
    _rows: PhantomData<fn(R)>,
}

impl<R: RowFormat> TerminalTable<R> {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            lines: VecDeque::new(),
            placeholders: 0,
            _rows: PhantomData,
        }
    }

    fn draw(&self, count: u64) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out)?;
        writeln!(out, "== {} ({} {}) ==", R::TITLE, count, R::COUNTER_LABEL)?;
        writeln!(out, "{}", R::header())?;
        for line in &self.lines {
            writeln!(out, "{line}")?;
        }
        for _ in 0..self.placeholders {
            writeln!(out, "{PLACEHOLDER}")?;
        }
        out.flush()
    }
}

impl<R: RowFormat> TableRenderer<R> for TerminalTable<R> {
    fn render_insert(&mut self, row: &R) {
        if self.json {
            match serde_json::to_string(row) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "could not serialize row"),
            }
        }
        self.lines.push_front(row.line());
    }

    fn render_evict(&mut self, _row: &R) {
        self.lines.pop_back();
    }

    fn render_pad(&mut self, placeholders: usize) {
        self.placeholders = placeholders;
    }

    fn render_count(&mut self, n: u64) {
        if self.json {
            return;
        }
        if let Err(e) = self.draw(n) {
            tracing::warn!(error = %e, view = R::TITLE, "failed to draw table");
        }
    }
}

pub fn print_health(status: HealthStatus) {
    println!("[health] {}", status.label());
}

pub fn print_block(block: &BlockDetail) {
    println!("Block {}", block.id);
    println!("  Slot:        {}", block.slot.map(|s| s.to_string()).unwrap_or_else(|| "—".into()));
    println!("  Hash:        {}", or_dash(&block.hash));
    println!("  Block root:  {}", or_dash(&block.root));
    match block.parent_id {
        Some(parent) => println!("  Parent:      block {parent} (/blocks/{parent})"),
        None => println!("  Parent:      {}", or_dash(&block.parent_hash)),
    }
    if !block.timestamp.is_empty() {
        println!("  Time:        {}", block.timestamp);
    }
    println!();
    println!("  Transactions ({}):", block.transactions.len());
    if block.transactions.is_empty() {
        println!("    none");
    }
    for tx in &block.transactions {
        println!(
            "    {:<19}  {:<28}  outputs {:>3}  total {}",
            short_hex(&tx.id),
            operations_preview(&tx.operations, 2),
            tx.output_count,
            format_amount(tx.total_output_value)
        );
    }
}

pub fn print_transaction(tx: &TransactionDetail) {
    println!("Transaction {}", tx.id);
    match tx.block_id {
        Some(block) => println!("  Block:        {block} (/blocks/{block})"),
        None => println!("  Block:        —"),
    }
    println!("  Hash:         {}", or_dash(&tx.hash));
    if !tx.timestamp.is_empty() {
        println!("  Time:         {}", tx.timestamp);
    }
    println!("  Operations:   {}", operations_preview(&tx.operations, tx.operations.len()));
    println!("  Exec gas:     {}", format_amount(tx.execution_gas_price));
    println!("  Storage gas:  {}", format_amount(tx.storage_gas_price));
    println!("  Proof:        {}", short_hex(&tx.proof));
    println!();
    println!("  Inputs ({}):", tx.inputs.len());
    for input in &tx.inputs {
        println!("    {input}");
    }
    println!("  Outputs ({}), total {}:", tx.outputs.len(), format_amount(tx.total_output_value));
    for note in &tx.outputs {
        println!("    {:<19}  {}", short_hex(&note.public_key), format_amount(note.value));
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "—"
    } else {
        s
    }
}
