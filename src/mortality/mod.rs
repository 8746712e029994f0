//! Mortality tables: annual qx/lx columns, qx reduction, and loading from CSV

mod iam;
mod table;
pub mod loader;

pub use table::{MortalityRow, MortalityTable, Sex, DEFAULT_RADIX};
pub use loader::{load_table, load_table_from_reader, load_table_with_abattement, REQUIRED_COLUMNS};
