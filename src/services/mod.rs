pub mod apy_calculator;
pub mod database;
pub mod epoch_processor;
pub mod jobs;
pub mod pagination;
pub mod reconciler;
pub mod scheduler;
pub mod sui_rpc;
