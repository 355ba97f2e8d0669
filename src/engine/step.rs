use crate::error::Result;
use crate::state::{SharedState, StateUpdate};
use async_trait::async_trait;

/// A unit of work in the pipeline.
///
/// Steps read the state they are given and return only the fields they
/// change. They never route; the engine decides what runs next.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, state: &SharedState) -> Result<StateUpdate>;

    /// True for steps that block on a person. The engine does not bound them
    /// with the step timeout.
    fn awaits_decision(&self) -> bool {
        false
    }
}
