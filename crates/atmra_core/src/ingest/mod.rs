pub mod repair_csv;
