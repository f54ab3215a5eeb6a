//! Agent runtime - hosts one named agent and schedules its behaviors.
//!
//! Each agent owns exactly one mailbox on the shared [`MessageBus`]. Every
//! behavior runs as its own tokio task, racing each step against the agent's
//! cancellation token, so `stop()` takes effect at the next suspension point
//! and a stopped behavior never sends again.

mod behavior;
mod lifecycle;

pub use behavior::{AgentContext, Behavior, BehaviorKind, Flow};
pub use lifecycle::AgentState;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::MessageBus;
use crate::types::{AgentId, Error, Result};

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime for one agent.
pub struct AgentRuntime {
    id: AgentId,
    bus: MessageBus,
    state: AgentState,
    shutdown_timeout: Duration,
    cancel: CancellationToken,
    pending: Vec<Box<dyn Behavior>>,
    ctx: Option<AgentContext>,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl AgentRuntime {
    pub fn new(id: AgentId, bus: MessageBus) -> Self {
        Self {
            id,
            bus,
            state: AgentState::Created,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            cancel: CancellationToken::new(),
            pending: Vec::new(),
            ctx: None,
            tasks: Vec::new(),
        }
    }

    /// Bound on how long `stop()` waits for behaviors to unwind before aborting them.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AgentState::Running
    }

    fn transition(&mut self, to: AgentState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::state_transition(format!(
                "agent {}: cannot go from {:?} to {:?}",
                self.id, self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }

    /// Queue a behavior; on a running agent it is scheduled immediately.
    pub fn add_behavior(&mut self, behavior: impl Behavior) -> Result<()> {
        self.add_boxed_behavior(Box::new(behavior))
    }

    pub fn add_boxed_behavior(&mut self, behavior: Box<dyn Behavior>) -> Result<()> {
        match self.state {
            AgentState::Created => {
                self.pending.push(behavior);
                Ok(())
            }
            AgentState::Running => {
                self.spawn(behavior);
                Ok(())
            }
            AgentState::Stopped => Err(Error::state_transition(format!(
                "agent {} is stopped; cannot add behavior {}",
                self.id,
                behavior.name()
            ))),
        }
    }

    /// Register the mailbox and launch every queued behavior.
    pub async fn start(&mut self) -> Result<()> {
        if !self.state.can_transition_to(AgentState::Running) {
            return Err(Error::state_transition(format!(
                "agent {} cannot start from {:?}",
                self.id, self.state
            )));
        }

        let mailbox = self.bus.register(self.id.clone()).await?;
        self.ctx = Some(AgentContext::new(
            self.id.clone(),
            self.bus.clone(),
            Arc::new(mailbox),
            self.cancel.clone(),
        ));
        self.transition(AgentState::Running)?;

        for behavior in std::mem::take(&mut self.pending) {
            self.spawn(behavior);
        }

        tracing::debug!(agent = %self.id, behaviors = self.tasks.len(), "Agent started");
        Ok(())
    }

    fn spawn(&mut self, behavior: Box<dyn Behavior>) {
        let Some(ctx) = self.ctx.clone() else {
            self.pending.push(behavior);
            return;
        };
        self.tasks.push(tokio::spawn(drive(behavior, ctx)));
    }

    /// Cancel all behaviors and unregister the mailbox. Safe to call more than once.
    pub async fn stop(&mut self) {
        match self.state {
            AgentState::Stopped => return,
            AgentState::Created => {
                self.pending.clear();
                self.state = AgentState::Stopped;
                return;
            }
            AgentState::Running => {}
        }

        self.cancel.cancel();

        let tasks = std::mem::take(&mut self.tasks);
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(self.shutdown_timeout, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            tracing::warn!(agent = %self.id, "Behaviors did not unwind in time; aborting");
            for handle in aborts {
                handle.abort();
            }
        }

        self.bus.unregister(&self.id).await;
        self.ctx = None;
        self.state = AgentState::Stopped;
        tracing::debug!(agent = %self.id, "Agent stopped");
    }
}

/// A runtime dropped without `stop()` still cancels and aborts its behaviors.
/// The bus entry goes stale once the aborted tasks release the mailbox.
impl Drop for AgentRuntime {
    fn drop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        tracing::debug!(agent = %self.id, behaviors = self.tasks.len(), "Agent dropped while running");
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Run one behavior until it finishes or the agent is cancelled.
async fn drive(mut behavior: Box<dyn Behavior>, ctx: AgentContext) {
    let name = behavior.name();
    let kind = behavior.kind();

    loop {
        let outcome = tokio::select! {
            biased;
            _ = ctx.stopped() => {
                tracing::trace!(agent = %ctx.id(), behavior = name, "Behavior cancelled");
                return;
            }
            outcome = behavior.step(&ctx) => outcome,
        };

        match outcome {
            Ok(Flow::Done) => break,
            Ok(Flow::Continue) if kind == BehaviorKind::Cyclic => continue,
            Ok(Flow::Continue) => break,
            Err(e) => {
                tracing::warn!(agent = %ctx.id(), behavior = name, error = %e, "Behavior step failed");
                if kind == BehaviorKind::OneShot {
                    break;
                }
            }
        }
    }

    tracing::trace!(agent = %ctx.id(), behavior = name, "Behavior finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Message, MessageKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(s: &str) -> AgentId {
        AgentId::must(s)
    }

    /// Counts steps, pausing between them; done after `limit`.
    struct Ticker {
        steps: Arc<AtomicUsize>,
        limit: usize,
        kind: BehaviorKind,
    }

    #[async_trait]
    impl Behavior for Ticker {
        fn name(&self) -> &'static str {
            "ticker"
        }

        fn kind(&self) -> BehaviorKind {
            self.kind
        }

        async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
            let n = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.pause(Duration::from_secs(1)).await;
            Ok(if n >= self.limit { Flow::Done } else { Flow::Continue })
        }
    }

    /// Sends one message to `to` every second, forever.
    struct Chatter {
        to: AgentId,
    }

    #[async_trait]
    impl Behavior for Chatter {
        fn name(&self) -> &'static str {
            "chatter"
        }

        async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
            ctx.pause(Duration::from_secs(1)).await;
            ctx.send(Message::new(ctx.id().clone(), self.to.clone(), MessageKind::Departed))
                .await?;
            Ok(Flow::Continue)
        }
    }

    /// Fails every step until `fail_for` runs out.
    struct Flaky {
        attempts: Arc<AtomicUsize>,
        fail_for: usize,
    }

    #[async_trait]
    impl Behavior for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn step(&mut self, ctx: &AgentContext) -> Result<Flow> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            ctx.pause(Duration::from_millis(10)).await;
            if n < self.fail_for {
                return Err(Error::internal("not yet"));
            }
            Ok(Flow::Done)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_runs_once_cyclic_loops() {
        let bus = MessageBus::new();
        let once = Arc::new(AtomicUsize::new(0));
        let looped = Arc::new(AtomicUsize::new(0));

        let mut agent = AgentRuntime::new(id("agent"), bus.clone());
        agent
            .add_behavior(Ticker {
                steps: once.clone(),
                limit: 100,
                kind: BehaviorKind::OneShot,
            })
            .unwrap();
        agent
            .add_behavior(Ticker {
                steps: looped.clone(),
                limit: 3,
                kind: BehaviorKind::Cyclic,
            })
            .unwrap();
        agent.start().await.unwrap();
        assert!(bus.is_registered(&id("agent")).await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(once.load(Ordering::SeqCst), 1);
        assert_eq!(looped.load(Ordering::SeqCst), 3);

        agent.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_and_unregisters() {
        let bus = MessageBus::new();
        let sink = bus.register(id("sink")).await.unwrap();

        let mut agent = AgentRuntime::new(id("chatty"), bus.clone());
        agent.add_behavior(Chatter { to: id("sink") }).unwrap();
        agent.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        agent.stop().await;
        assert_eq!(agent.state(), AgentState::Stopped);
        assert!(!bus.is_registered(&id("chatty")).await);

        let mut heard = 0;
        while sink.try_receive().await.is_some() {
            heard += 1;
        }
        assert_eq!(heard, 3);

        // nothing more after stop
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.try_receive().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_runtime_goes_quiet() {
        let bus = MessageBus::new();
        let sink = bus.register(id("sink")).await.unwrap();

        {
            let mut agent = AgentRuntime::new(id("chatty"), bus.clone());
            agent.add_behavior(Chatter { to: id("sink") }).unwrap();
            agent.start().await.unwrap();
            tokio::time::sleep(Duration::from_millis(2500)).await;
        }

        let mut heard = 0;
        while sink.try_receive().await.is_some() {
            heard += 1;
        }
        assert_eq!(heard, 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.try_receive().await.is_none());
        assert!(!bus.is_registered(&id("chatty")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_behavior_added_while_running_starts_now() {
        let bus = MessageBus::new();
        let steps = Arc::new(AtomicUsize::new(0));

        let mut agent = AgentRuntime::new(id("late"), bus);
        agent.start().await.unwrap();
        agent
            .add_behavior(Ticker {
                steps: steps.clone(),
                limit: 1,
                kind: BehaviorKind::OneShot,
            })
            .unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(steps.load(Ordering::SeqCst), 1);
        agent.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cyclic_behavior_survives_failed_steps() {
        let bus = MessageBus::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let mut agent = AgentRuntime::new(id("flaky"), bus);
        agent
            .add_behavior(Flaky {
                attempts: attempts.clone(),
                fail_for: 3,
            })
            .unwrap();
        agent.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        agent.stop().await;
    }

    #[tokio::test]
    async fn test_lifecycle_guards() {
        let bus = MessageBus::new();
        let mut agent = AgentRuntime::new(id("guarded"), bus.clone());
        agent.start().await.unwrap();

        let err = agent.start().await.unwrap_err();
        assert!(matches!(err, Error::StateTransition(_)));

        agent.stop().await;
        agent.stop().await;
        assert!(agent.state().is_terminal());

        assert!(agent.start().await.is_err());
        let err = agent
            .add_behavior(Chatter { to: id("sink") })
            .unwrap_err();
        assert!(err.to_string().contains("stopped"));
    }

    #[tokio::test]
    async fn test_start_fails_when_id_taken() {
        let bus = MessageBus::new();
        let _squatter = bus.register(id("kitchen")).await.unwrap();

        let mut agent = AgentRuntime::new(id("kitchen"), bus);
        let err = agent.start().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
        assert_eq!(agent.state(), AgentState::Created);
    }
}
