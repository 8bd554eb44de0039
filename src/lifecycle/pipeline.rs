use crate::clients::AccrualService;
use crate::config::PipelineConfig;
use crate::lifecycle::{shutdown, OrderSender, PipelineError, Shutdown, ShutdownTrigger};
use crate::model::OrderNumber;
use crate::repository::OrderRepository;
use crate::workers::{partition_pending, processing_channel, AccrualWorker, RegistrationWorker};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

/// The running accrual pipeline.
///
/// `AccrualPipeline` is responsible for:
/// - **Bootstrap**: loading unresolved orders and splitting them across the polling pool
/// - **Wiring**: intake → registration → processing queue → polling workers
/// - **Shutdown**: closing intake, firing the shutdown signal and waiting, with a bound,
///   for every task it started
///
/// # Example
///
/// ```ignore
/// let (intake, intake_rx) = order_channel(config.intake_capacity);
/// let mut pipeline = AccrualPipeline::start(&config, accrual, repository, intake_rx).await?;
/// pipeline.spawn_task("dispatcher", dispatcher.run(pipeline.shutdown_signal()));
///
/// intake.send(number).await?;
///
/// pipeline.shutdown(intake, config.shutdown_timeout).await?;
/// ```
pub struct AccrualPipeline {
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
    repository: Arc<dyn OrderRepository>,
    /// Named task handles, awaited in order on shutdown
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl AccrualPipeline {
    /// Loads the startup backlog and starts the registration worker plus
    /// `config.poll_workers` polling workers.
    pub async fn start(
        config: &PipelineConfig,
        accrual: Arc<dyn AccrualService>,
        repository: Arc<dyn OrderRepository>,
        intake: mpsc::Receiver<OrderNumber>,
    ) -> Result<Self, PipelineError> {
        let (trigger, shutdown) = shutdown::channel();
        let mut pipeline = Self {
            trigger,
            shutdown,
            repository: repository.clone(),
            tasks: Vec::new(),
        };

        let backlog = repository.unprocessed_order_numbers().await?;
        let backlog_size = backlog.len();
        let slices = partition_pending(backlog, config.poll_workers);
        info!(backlog = backlog_size, workers = slices.len(), "Starting accrual pipeline");

        let (processing, queue) = processing_channel(config.processing_queue_capacity);

        let registration = RegistrationWorker::new(intake, processing, accrual.clone());
        let signal = pipeline.shutdown_signal();
        pipeline.spawn_task("registration", async move {
            registration.run(signal).await;
        });

        for (id, seed) in slices.into_iter().enumerate() {
            let worker = AccrualWorker::new(
                id,
                queue.clone(),
                seed,
                accrual.clone(),
                repository.clone(),
                config.min_poll_interval,
            );
            let signal = pipeline.shutdown_signal();
            pipeline.spawn_task(format!("accrual-worker-{id}"), async move {
                worker.run(signal).await;
            });
        }

        Ok(pipeline)
    }

    /// A fresh view of the pipeline's shutdown signal, for tasks attached
    /// with [`spawn_task`](Self::spawn_task).
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Attaches a long-lived task to the pipeline so shutdown waits for it.
    pub fn spawn_task<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        info!(task = %name, "Task started");
        self.tasks.push((name, tokio::spawn(task)));
    }

    /// Waits until storage holds no unresolved order, checking every
    /// `check_every`. Returns `Ok(false)` if `timeout` passes first.
    ///
    /// Nothing is cancelled here; callers that want in-flight orders to
    /// finish run this before [`shutdown`](Self::shutdown).
    pub async fn wait_until_drained(
        &self,
        check_every: Duration,
        timeout: Duration,
    ) -> Result<bool, PipelineError> {
        let check_every = check_every.max(Duration::from_millis(1));
        let drained = time::timeout(timeout, async {
            loop {
                let unresolved = self
                    .repository
                    .unprocessed_order_numbers()
                    .await
                    .map_err(PipelineError::Drain)?;
                if unresolved.is_empty() {
                    return Ok(());
                }
                debug!(unresolved = unresolved.len(), "Waiting for orders to resolve");
                time::sleep(check_every).await;
            }
        })
        .await;

        match drained {
            Ok(Ok(())) => {
                info!("All orders resolved");
                Ok(true)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(timeout_ms, "Orders still unresolved at drain deadline");
                Ok(false)
            }
        }
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Shuts the pipeline down.
    ///
    /// 1. Closes `intake` so no new orders enter.
    /// 2. Fires the shutdown signal so every blocking wait returns.
    /// 3. Waits up to `timeout` for every task.
    ///
    /// Tasks still running at the deadline are reported in
    /// [`PipelineError::ShutdownTimedOut`] and aborted, so this never hangs.
    pub async fn shutdown(mut self, intake: OrderSender, timeout: Duration) -> Result<(), PipelineError> {
        info!(tasks = self.tasks.len(), "Shutting down pipeline...");

        intake.close();
        self.trigger.trigger();

        let finished = time::timeout(timeout, async {
            for (name, handle) in self.tasks.iter_mut() {
                if let Err(e) = handle.await {
                    error!(task = %name, error = %e, "Task failed");
                }
            }
        })
        .await;

        if finished.is_ok() {
            info!("Pipeline shutdown complete.");
            return Ok(());
        }

        let unfinished: Vec<String> = self
            .tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();
        for (_, handle) in &self.tasks {
            handle.abort();
        }
        let timeout_ms = timeout.as_millis() as u64;
        warn!(timeout_ms, ?unfinished, "Pipeline shutdown timed out, aborting remaining tasks");
        Err(PipelineError::ShutdownTimedOut { unfinished })
    }
}
