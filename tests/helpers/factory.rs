pub use super::factories::{CommandFactory, EventRecorder, StubEngine};

pub struct Factory;

impl Factory {
    pub fn sql_command() -> CommandFactory {
        CommandFactory::sql()
    }

    pub fn sparql_command() -> CommandFactory {
        CommandFactory::sparql()
    }

    pub fn stub_engine() -> StubEngine {
        StubEngine::new("sql")
    }

    pub fn event_recorder() -> EventRecorder {
        EventRecorder::new(64)
    }
}
