use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::command::{Command, Language};
use crate::engine::errors::{FailureError, GatewayError, UsageError};
use crate::engine::invocation::{CancelHandle, Engine};
use crate::engine::registry::errors::RegistryError;
use crate::engine::registry::pending::{Outcome, Pending, QueryFailure};
use crate::engine::registry::pool::{Admission, WorkerPool};
use crate::engine::registry::result::{CloseGuard, ExecutionResult, fail};
use crate::insight::{Correlation, Emitter, EventDraft, ScopedEmitter, Subject};
use crate::shared::media::MediaType;

const LOG_TARGET: &str = "gateway::registry";

/// Maps languages to engines and runs their invocations on a bounded pool.
///
/// Built once at startup; the engine table is read-only afterwards.
pub struct EngineRegistry {
    engines: HashMap<Language, Arc<dyn Engine>>,
    pool: WorkerPool,
    timeout: Duration,
    emitter: Emitter,
}

pub struct EngineRegistryBuilder {
    engines: HashMap<Language, Arc<dyn Engine>>,
    pool_size: usize,
    queue_depth: usize,
    timeout: Duration,
    emitter: Option<Emitter>,
}

impl EngineRegistryBuilder {
    /// Adds an engine; a second engine for the same language is rejected.
    pub fn register(mut self, engine: Arc<dyn Engine>) -> Result<Self, RegistryError> {
        let language = engine.language();
        if self.engines.contains_key(&language) {
            return Err(RegistryError::DuplicateLanguage(language.to_string()));
        }
        debug!(target: LOG_TARGET, %language, engine = engine.name(), "Registered engine");
        self.engines.insert(language, engine);
        Ok(self)
    }

    pub fn pool(mut self, size: usize, queue_depth: usize) -> Self {
        self.pool_size = size;
        self.queue_depth = queue_depth;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn build(self) -> Result<EngineRegistry, RegistryError> {
        if self.pool_size == 0 {
            return Err(RegistryError::EmptyPool);
        }
        if self.timeout.is_zero() {
            return Err(RegistryError::ZeroTimeout);
        }
        let emitter = self.emitter.unwrap_or_else(|| Emitter::detached(false));
        info!(
            target: LOG_TARGET,
            engines = self.engines.len(),
            pool_size = self.pool_size,
            queue_depth = self.queue_depth,
            timeout_ms = self.timeout.as_millis() as u64,
            "Engine registry ready"
        );
        Ok(EngineRegistry {
            engines: self.engines,
            pool: WorkerPool::new(self.pool_size, self.queue_depth),
            timeout: self.timeout,
            emitter,
        })
    }
}

impl EngineRegistry {
    pub fn builder() -> EngineRegistryBuilder {
        EngineRegistryBuilder {
            engines: HashMap::new(),
            pool_size: 4,
            queue_depth: 16,
            timeout: Duration::from_secs(30),
            emitter: None,
        }
    }

    pub fn languages(&self) -> Vec<&Language> {
        let mut languages: Vec<_> = self.engines.keys().collect();
        languages.sort();
        languages
    }

    pub fn engine(&self, language: &Language) -> Option<&Arc<dyn Engine>> {
        self.engines.get(language)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Prepares the command on the calling thread and schedules its execution.
    ///
    /// Usage errors and backpressure fail here without occupying the pool.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, command: Command) -> Result<Pending, QueryFailure> {
        let scope = self.emitter.scoped(Correlation::generate());

        let engine = self.engines.get(command.language()).ok_or_else(|| {
            fail(
                &scope,
                UsageError::LanguageNotSupported(command.language().to_string()).into(),
            )
        })?;
        let mut invocation = engine.prepare(&command).map_err(|e| fail(&scope, e))?;
        let media_type = invocation.produces().clone();

        scope.emit(
            EventDraft::request(Subject::Received)
                .properties(command.properties())
                .property("engine", engine.name())
                .property("format", media_type.to_string()),
        );

        let admission = match self.pool.admit() {
            Ok(admission) => admission,
            Err(error) => {
                invocation.close();
                return Err(fail(&scope, error.into()));
            }
        };

        let cancel = invocation.cancel_handle();
        let (tx, rx) = oneshot::channel();
        let job = Job {
            guard: CloseGuard::new(invocation),
            admission,
            cancel: cancel.clone(),
            media_type,
            scope: scope.clone(),
            deadline: Instant::now() + self.timeout,
            timeout: self.timeout,
        };
        tokio::spawn(job.supervise(tx));
        Ok(Pending::new(rx, cancel, scope))
    }
}

/// One scheduled invocation and everything needed to see it through.
struct Job {
    guard: CloseGuard,
    admission: Admission,
    cancel: CancelHandle,
    media_type: MediaType,
    scope: ScopedEmitter,
    deadline: Instant,
    timeout: Duration,
}

enum Interruption {
    TimedOut,
    Disconnected,
}

impl Job {
    async fn supervise(self, mut tx: oneshot::Sender<Outcome>) {
        let Job {
            guard,
            admission,
            cancel,
            media_type,
            scope,
            deadline,
            timeout,
        } = self;

        let ticket = tokio::select! {
            ticket = timeout_at(deadline, admission.slot()) => match ticket {
                Ok(Ok(ticket)) => ticket,
                Ok(Err(error)) => {
                    drop(guard);
                    let _ = tx.send(Err(fail(&scope, error.into())));
                    return;
                }
                Err(_) => {
                    cancel.cancel();
                    drop(guard);
                    interrupted(Interruption::TimedOut, timeout, &scope, tx);
                    return;
                }
            },
            _ = tx.closed() => {
                cancel.cancel();
                drop(guard);
                interrupted(Interruption::Disconnected, timeout, &scope, tx);
                return;
            }
        };

        let correlation = scope.correlation().clone();
        let mut handle = tokio::task::spawn_blocking(move || {
            let _ticket = ticket;
            let mut guard = guard;
            debug!(target: LOG_TARGET, %correlation, "Executing invocation");
            let outcome = guard.invocation().execute();
            (guard, outcome)
        });

        let joined = tokio::select! {
            joined = timeout_at(deadline, &mut handle) => match joined {
                Ok(joined) => joined,
                Err(_) => {
                    cancel.cancel();
                    interrupted(Interruption::TimedOut, timeout, &scope, tx);
                    return;
                }
            },
            _ = tx.closed() => {
                cancel.cancel();
                interrupted(Interruption::Disconnected, timeout, &scope, tx);
                return;
            }
        };

        let outcome = match joined {
            Ok((guard, Ok(()))) => {
                scope.emit(EventDraft::request(Subject::Executed));
                Ok(ExecutionResult::new(guard, media_type, scope))
            }
            Ok((guard, Err(error))) => {
                drop(guard);
                Err(fail(&scope, error))
            }
            Err(join_error) => Err(fail(
                &scope,
                FailureError::Internal(format!("execution aborted: {join_error}")).into(),
            )),
        };
        if let Err(Ok(result)) = tx.send(outcome) {
            debug!(target: LOG_TARGET, correlation = %result.correlation(), "Client left before the result was delivered");
        }
    }
}

fn interrupted(
    reason: Interruption,
    timeout: Duration,
    scope: &ScopedEmitter,
    tx: oneshot::Sender<Outcome>,
) {
    let error: GatewayError = match reason {
        Interruption::TimedOut => FailureError::Timeout(timeout).into(),
        Interruption::Disconnected => {
            warn!(target: LOG_TARGET, correlation = %scope.correlation(), "Client disconnected, cancelling");
            FailureError::Cancelled.into()
        }
    };
    let _ = tx.send(Err(fail(scope, error)));
}
