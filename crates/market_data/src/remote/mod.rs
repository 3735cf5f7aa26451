pub mod chart_response;
pub mod index_table;
pub mod yahoo_client;

pub use chart_response::ChartEnvelope;
pub use index_table::IndexTableSource;
pub use yahoo_client::YahooClient;
