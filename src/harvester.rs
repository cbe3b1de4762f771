//! The top-level entry point: wires ingestion, reassembly, stream handling,
//! and persistence into a single run.

use tracing::info;

use crate::assembler::{Assembler, StreamFactory, StreamSink};
use crate::capture::{self, PacketSource, RunTotals};
use crate::config::{Config, LogTarget};
use crate::error::HarvestError;
use crate::flow::{Direction, FlowKey};
use crate::output::OutputRoot;
use crate::persist::{PersistHandle, PersistWorker};
use crate::shutdown::TripWire;

/// Spawns a [`crate::handler::handle_stream`] task for every new half-flow
/// the assembler observes.
struct TaskSpawningFactory {
    persist: PersistHandle,
}

impl StreamFactory for TaskSpawningFactory {
    fn new_stream(&self, flow_key: FlowKey, direction: Direction, idx: u64, sink: StreamSink) {
        let persist = self.persist.clone();
        tokio::spawn(crate::handler::handle_stream(flow_key, direction, idx, sink, persist));
    }
}

/// Ties ingestion, reassembly, stream handling, and persistence into a
/// single run over one capture source.
pub struct Harvester {
    config: Config,
}

impl Harvester {
    pub fn new(config: Config) -> Self {
        Harvester { config }
    }

    /// Runs to completion: prepares the output root, starts the persist
    /// worker, then drives the ingestion loop over `source` until it or
    /// `shutdown` signals the run is over.
    pub async fn run(
        self,
        source: Box<dyn PacketSource>,
        shutdown: TripWire,
    ) -> Result<RunTotals, HarvestError> {
        let output_root = OutputRoot::prepare(&self.config)?;
        info!(path = %output_root.path().display(), "output root prepared");

        let log_file: Box<dyn std::io::Write + Send> = match self.config.log_target {
            LogTarget::Stdout => Box::new(std::io::stdout()),
            LogTarget::File => {
                let path = output_root.path().join("extractor.log");
                let file = std::fs::File::create(&path)
                    .map_err(|source| HarvestError::OutputRoot { path, source })?;
                Box::new(file)
            }
        };

        let (worker, persist) = PersistWorker::new(
            output_root.path().to_path_buf(),
            self.config.output_formats.clone(),
            log_file,
        );
        let worker_task = tokio::spawn(worker.run());

        let factory = TaskSpawningFactory { persist: persist.clone() };
        let assembler = Assembler::new(factory, self.config.max_reorder_buffer);

        let totals = capture::run(source, assembler, self.config.max_age, shutdown).await;

        // Dropping every `PersistHandle` clone (this one, and the one the
        // assembler's factory held until it was dropped above) closes the
        // submission channel, moving the worker from `running` to
        // `draining`.
        drop(persist);

        worker_task.await.map_err(|join_err| HarvestError::Persist {
            path: output_root.path().to_path_buf(),
            source: std::io::Error::other(join_err.to_string()),
        })??;

        Ok(totals)
    }
}
