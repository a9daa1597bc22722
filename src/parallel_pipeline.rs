use crate::core_modules::assembler;
use crate::core_modules::cell::Cell;
use crate::core_modules::grid;
use crate::error::{SpriteError, SpriteResult};
use crate::pipeline::{
    CellTrace, ClassificationResult, MovementGroup, MovementLabel, PipelineConfig,
    SeparationPipeline, SheetReport,
};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One cell queued for sampling and classification.
struct CellTask {
    cell: Cell,
    result_sender: oneshot::Sender<SpriteResult<(ClassificationResult, CellTrace)>>,
}

/// A fixed pool of classification workers fed round-robin by a dispatcher.
struct WorkerPool {
    task_sender: mpsc::UnboundedSender<CellTask>,
    _workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    fn new(pipeline: Arc<SeparationPipeline>, worker_count: usize) -> Self {
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<CellTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<CellTask>())
            .unzip();

        // Dispatcher: distributes incoming cells across workers.
        tokio::spawn(async move {
            let mut worker_index = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_index].send(task);
                worker_index = (worker_index + 1) % worker_count;
            }
        });

        let mut workers = Vec::with_capacity(worker_count);
        for mut worker_receiver in worker_receivers {
            let worker_pipeline = Arc::clone(&pipeline);
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let sampler = &worker_pipeline.config().sampler;
                    let outcome = worker_pipeline.classify_cell(task.cell, sampler);
                    let _ = task.result_sender.send(outcome);
                }
            }));
        }

        Self {
            task_sender,
            _workers: workers,
        }
    }

    fn submit(&self, task: CellTask) -> SpriteResult<()> {
        self.task_sender
            .send(task)
            .map_err(|_| SpriteError::pool("all classification workers have exited"))
    }
}

/// A concurrent front end over [`SeparationPipeline`].
///
/// Cells are independent of each other, so sampling and classification
/// scatter freely across workers. Grouping is the join barrier: results are
/// gathered back in scan order, which makes the parallel report identical to
/// the sequential one.
pub struct ParallelSeparationPipeline {
    pipeline: Arc<SeparationPipeline>,
    worker_pool: WorkerPool,
}

impl ParallelSeparationPipeline {
    /// Spawns one worker per available core. Must be called from within a
    /// tokio runtime.
    pub fn new(config: PipelineConfig) -> SpriteResult<Self> {
        Self::with_workers(config, num_cpus::get().max(1))
    }

    pub fn with_workers(config: PipelineConfig, worker_count: usize) -> SpriteResult<Self> {
        let pipeline = Arc::new(SeparationPipeline::new(config)?);
        let worker_pool = WorkerPool::new(Arc::clone(&pipeline), worker_count.max(1));
        Ok(Self {
            pipeline,
            worker_pool,
        })
    }

    /// The underlying sequential pipeline, for plan runs and configuration.
    pub fn inner(&self) -> &SeparationPipeline {
        &self.pipeline
    }

    /// Runs the full separation with per-cell work spread across the pool.
    pub async fn run(&self, sheet: &RgbaImage) -> SpriteResult<SheetReport> {
        // Stage 1: Partition (serial; trivial next to per-cell work)
        let cells = grid::partition(sheet, &self.pipeline.config().grid)?;

        // Stage 2 + 3: Scatter cells across the workers
        let mut receivers = Vec::with_capacity(cells.len());
        for cell in cells {
            let (result_sender, result_receiver) = oneshot::channel();
            self.worker_pool.submit(CellTask {
                cell,
                result_sender,
            })?;
            receivers.push(result_receiver);
        }

        // Stage 4: Join barrier. `join_all` yields in submission order, so
        // scan order is restored regardless of completion order.
        let outcomes = futures::future::join_all(receivers).await;
        let mut results = Vec::with_capacity(outcomes.len());
        let mut traces = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let (result, trace) = outcome
                .map_err(|_| SpriteError::pool("a classification worker dropped its result"))??;
            results.push(result);
            traces.push(trace);
        }

        // Stage 5: Group by label
        let groups = assembler::group_results(results);
        let report = SheetReport { groups, traces };
        crate::pipeline::log_summary(&report);
        Ok(report)
    }

    /// Builds the per-group composite strips concurrently, consuming the
    /// groups. Strip order matches group order.
    pub async fn composite_strips(
        &self,
        groups: Vec<MovementGroup>,
    ) -> SpriteResult<Vec<(MovementLabel, RgbaImage)>> {
        let fill = Rgba(self.pipeline.config().composite_fill);

        let handles: Vec<_> = groups
            .into_iter()
            .map(|group| {
                tokio::spawn(async move {
                    let strip = assembler::composite_strip(&group.members, fill);
                    (group.label, strip)
                })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;
        let mut strips = Vec::with_capacity(joined.len());
        for outcome in joined {
            strips.push(outcome.map_err(|_| SpriteError::pool("a composite task was cancelled"))?);
        }
        Ok(strips)
    }
}
