//! sea-orm entities for the rewards service tables.

pub mod events;
pub mod jobs;
pub mod ledger_entries;
