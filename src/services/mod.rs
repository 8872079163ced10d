pub mod compression;
pub mod credentials;
pub mod csv_ingest;
pub mod csv_rewrite;
pub mod fetch;
pub mod pipeline;
pub mod storage;
