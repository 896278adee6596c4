// Bar ingestion and in-memory storage
pub mod csv_parser;
pub mod market_data;
