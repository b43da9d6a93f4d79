//! The turn loop.
//!
//! A turn is an explicit state machine over four working states. The
//! coordinator runs first; the router picks either the end of the turn or
//! one updater; every updater hands control back to the coordinator so it
//! can reply to the user with the acknowledgment in view.

use crate::config::MaestroConfig;
use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::id::{KeyGenerator, UuidKeys};
use crate::llm::{GenerationService, Turn};
use crate::message::ConversationState;
use crate::router::{route, Route};
use crate::store::MemoryStore;
use crate::updater::{
    InstructionsUpdater, ProfileUpdater, TodoUpdater, UpdateReport, Updater,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default bound on steps per turn
pub const DEFAULT_MAX_STEPS: usize = 25;

/// State of the turn loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Ask the coordinator for the next message
    Coordinator,
    /// Run the to-do updater
    UpdateTodo,
    /// Run the profile updater
    UpdateProfile,
    /// Run the instructions updater
    UpdateInstructions,
    /// The turn is over
    Done,
}

impl From<Route> for Step {
    fn from(route: Route) -> Self {
        match route {
            Route::Terminate => Step::Done,
            Route::UpdateTodo => Step::UpdateTodo,
            Route::UpdateProfile => Step::UpdateProfile,
            Route::UpdateInstructions => Step::UpdateInstructions,
        }
    }
}

/// Next step after `step` has run against `state`
pub fn transition(step: Step, state: &ConversationState) -> Result<Step> {
    match step {
        Step::Coordinator => match state.last() {
            Some(last) => Ok(route(last)?.into()),
            None => Ok(Step::Done),
        },
        Step::UpdateTodo | Step::UpdateProfile | Step::UpdateInstructions => Ok(Step::Coordinator),
        Step::Done => Ok(Step::Done),
    }
}

/// What happened during one turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Steps executed, coordinator runs included
    pub steps: usize,
    /// One report per updater run, in order
    pub updates: Vec<UpdateReport>,
}

/// Memory-keeping conversational agent
pub struct TaskMaestro {
    generator: Arc<dyn GenerationService>,
    store: Arc<dyn MemoryStore>,
    coordinator: Coordinator,
    profile: ProfileUpdater,
    todo: TodoUpdater,
    instructions: InstructionsUpdater,
    max_steps: usize,
}

impl TaskMaestro {
    /// Create an agent with random record keys
    pub fn new(generator: Arc<dyn GenerationService>, store: Arc<dyn MemoryStore>) -> Self {
        let keys: Arc<dyn KeyGenerator> = Arc::new(UuidKeys);
        Self {
            coordinator: Coordinator::new(generator.clone(), store.clone()),
            profile: ProfileUpdater::new(generator.clone(), store.clone(), keys.clone()),
            todo: TodoUpdater::new(generator.clone(), store.clone(), keys.clone()),
            instructions: InstructionsUpdater::new(generator.clone(), store.clone(), keys),
            generator,
            store,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Create an agent using the configured step limit
    pub fn from_config(
        config: &MaestroConfig,
        generator: Arc<dyn GenerationService>,
        store: Arc<dyn MemoryStore>,
    ) -> Self {
        Self::new(generator, store).with_max_steps(config.max_steps)
    }

    /// Use a different key generator for inserted records
    pub fn with_keys(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.profile = ProfileUpdater::new(self.generator.clone(), self.store.clone(), keys.clone());
        self.todo = TodoUpdater::new(self.generator.clone(), self.store.clone(), keys.clone());
        self.instructions = InstructionsUpdater::new(self.generator.clone(), self.store.clone(), keys);
        self
    }

    /// Bound the number of steps per turn
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The store this agent writes to
    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }

    /// Run one turn: loop until the coordinator stops asking for updates.
    ///
    /// Messages produced during the turn are appended to `state`. On error the
    /// messages appended so far are kept, and writes made by updaters that
    /// already finished stay in the store.
    #[instrument(skip_all, fields(user_id = %turn.user_id))]
    pub async fn run_turn(&self, state: &mut ConversationState, turn: &Turn) -> Result<TurnReport> {
        let mut report = TurnReport::default();
        let mut step = Step::Coordinator;

        while step != Step::Done {
            if report.steps >= self.max_steps {
                return Err(Error::StepLimitExceeded {
                    max: self.max_steps,
                });
            }
            debug!(?step, n = report.steps, "running step");

            match step {
                Step::Coordinator => self.coordinator.advance(state, turn).await?,
                Step::UpdateTodo => report.updates.push(self.todo.run(state, turn).await?),
                Step::UpdateProfile => report.updates.push(self.profile.run(state, turn).await?),
                Step::UpdateInstructions => {
                    report.updates.push(self.instructions.run(state, turn).await?)
                }
                Step::Done => {}
            }
            report.steps += 1;
            step = transition(step, state)?;
        }

        info!(steps = report.steps, updates = report.updates.len(), "turn complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::store::InMemoryStore;
    use crate::testing::{update_memory, ScriptedGenerator};

    #[test]
    fn test_transitions() {
        let mut state = ConversationState::new();
        state.push(Message::assistant("Hello!"));
        assert_eq!(transition(Step::Coordinator, &state).unwrap(), Step::Done);
        assert_eq!(transition(Step::UpdateTodo, &state).unwrap(), Step::Coordinator);
        assert_eq!(transition(Step::Done, &state).unwrap(), Step::Done);

        state.push(update_memory("c1", "instructions"));
        assert_eq!(
            transition(Step::Coordinator, &state).unwrap(),
            Step::UpdateInstructions
        );
    }

    #[tokio::test]
    async fn test_plain_reply_is_one_step() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push(Message::assistant("Hi there!"));
        let maestro = TaskMaestro::new(generator, Arc::new(InMemoryStore::new()));

        let mut state = ConversationState::new();
        state.push(Message::user("Hello"));
        let report = maestro.run_turn(&mut state, &Turn::new("u1")).await.unwrap();

        assert_eq!(report.steps, 1);
        assert!(report.updates.is_empty());
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_max_steps() {
        let generator = Arc::new(ScriptedGenerator::new());
        let maestro = TaskMaestro::new(generator, Arc::new(InMemoryStore::new())).with_max_steps(0);

        let mut state = ConversationState::new();
        let err = maestro.run_turn(&mut state, &Turn::new("u1")).await.unwrap_err();
        assert!(matches!(err, Error::StepLimitExceeded { max: 0 }));
    }
}
