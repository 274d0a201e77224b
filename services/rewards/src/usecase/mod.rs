pub mod fulfillment;
pub mod ingest;
pub mod ops;
pub mod scheduler;
pub mod stages;
