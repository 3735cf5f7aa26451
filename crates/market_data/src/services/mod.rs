pub mod history_fetcher;
pub mod universe_builder;
