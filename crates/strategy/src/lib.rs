pub mod services;

pub use services::breakout_detector::BreakoutDetector;
