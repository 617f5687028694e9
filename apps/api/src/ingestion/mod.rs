// Resume ingestion: upload -> extraction -> persistence, with monotonic
// progress published on a watch channel per ingestion.
// All model calls go through the AiCapability trait.

pub mod handlers;
pub mod pipeline;
pub mod progress;
pub mod schema;
