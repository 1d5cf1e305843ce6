//! Helios CDR ingestion
//!
//! The front door of the system: a line-oriented TCP listener that accepts
//! one raw CDR per connection from the PBX, parses it, runs the full
//! classification/rating/quota pipeline, commits the result, and answers
//! with a short acknowledgement or error text.
//!
//! ```text
//! PBX ---- "Call 10:00:00,00447911123456,1001,0:02:30,..." ----> IngestServer
//!                                                                    |
//!                                                              parse_line
//!                                                                    |
//!                                            classify -> match -> rate -> ledger
//!                                                                    |
//!                                                              repository commit
//!                                                                    |
//! PBX <----------------- "CDR received and processed" ---------------+
//! ```

pub mod parser;
pub mod pipeline;
pub mod server;

pub use parser::parse_line;
pub use pipeline::IngestPipeline;
pub use server::IngestServer;
