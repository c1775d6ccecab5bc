//! View models: per-view normalizers that turn raw backend records into rows.

pub mod blocks;
pub mod fields;
pub mod transactions;

pub use blocks::{BlockDetail, BlockFields, BlockNormalizer, BlockRow};
pub use transactions::{TransactionDetail, TransactionFields, TransactionNormalizer, TransactionRow};
