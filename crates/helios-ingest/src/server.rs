//! CDR ingestion TCP server
//!
//! One short-lived connection per CDR: the PBX connects, writes one line,
//! and waits for the acknowledgement text. The handler performs a single
//! bounded read under a timeout, runs the pipeline, writes the reply, and
//! closes. Connections that send nothing inside the read window, or more
//! than the line-size cap, are dropped.

use helios_core::{
    config::IngestConfig,
    traits::{CallRecordRepository, PatternRepository, QuotaRepository},
    AppResult,
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

use crate::pipeline::IngestPipeline;

/// Reply sent for every successfully committed record
const REPLY_OK: &str = "CDR received and processed";

/// Line-oriented TCP front end over the ingestion pipeline
pub struct IngestServer<C, P, Q>
where
    C: CallRecordRepository + Send + Sync + 'static,
    P: PatternRepository + Send + Sync + 'static,
    Q: QuotaRepository + Send + Sync + 'static,
{
    pipeline: Arc<IngestPipeline<C, P, Q>>,
    config: IngestConfig,
}

impl<C, P, Q> IngestServer<C, P, Q>
where
    C: CallRecordRepository + Send + Sync + 'static,
    P: PatternRepository + Send + Sync + 'static,
    Q: QuotaRepository + Send + Sync + 'static,
{
    pub fn new(pipeline: Arc<IngestPipeline<C, P, Q>>, config: IngestConfig) -> Self {
        Self { pipeline, config }
    }

    /// Bind and run the accept loop until the process stops
    pub async fn start(self, bind_address: &str) -> AppResult<()> {
        let listener = TcpListener::bind(bind_address).await?;
        info!(address = bind_address, "CDR ingestion server listening");
        self.serve(listener).await
    }

    /// Run the accept loop over an already bound listener
    ///
    /// Split out from `start` so tests can bind to an ephemeral port first
    /// and learn the address.
    pub async fn serve(self, listener: TcpListener) -> AppResult<()> {
        let pipeline = self.pipeline;
        let config = Arc::new(self.config);

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let pipeline = pipeline.clone();
                    let config = config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &pipeline, &config).await {
                            warn!(%peer, "connection handler failed: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("accept failed: {}", e);
                }
            }
        }
    }
}

/// Serve one connection: bounded read, pipeline, reply, close
///
/// Pipeline failures are not connection failures. The PBX gets the error
/// text back and the stream still closes cleanly; only transport errors
/// propagate.
async fn handle_connection<C, P, Q>(
    mut stream: TcpStream,
    pipeline: &IngestPipeline<C, P, Q>,
    config: &IngestConfig,
) -> AppResult<()>
where
    C: CallRecordRepository,
    P: PatternRepository,
    Q: QuotaRepository,
{
    let mut buf = vec![0u8; config.max_line_bytes];
    let read_window = Duration::from_secs(config.read_timeout_secs);

    let n = match timeout(read_window, stream.read(&mut buf)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("connection sent nothing within the read window, dropping");
            return Ok(());
        }
    };
    if n == 0 {
        return Ok(());
    }

    let line = String::from_utf8_lossy(&buf[..n]);
    let reply = match pipeline.process_line(&line).await {
        Ok(record) => {
            info!(record_id = record.id, callee = %record.callee, "CDR accepted");
            REPLY_OK.to_string()
        }
        Err(e) => {
            warn!(line = %line.trim(), "CDR rejected: {}", e);
            e.wire_reply()
        }
    };

    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
