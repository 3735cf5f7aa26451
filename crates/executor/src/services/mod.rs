pub mod alert_dispatcher;
pub mod annotator;
pub mod gemini_service;
pub mod scan_job;
pub mod telegram_service;
