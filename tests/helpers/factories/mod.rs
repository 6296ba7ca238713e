pub mod command_factory;
pub mod event_recorder;
pub mod stub_engine;

pub use command_factory::CommandFactory;
pub use event_recorder::EventRecorder;
pub use stub_engine::{StubCounters, StubEngine};

#[cfg(test)]
mod command_factory_test;
#[cfg(test)]
mod stub_engine_test;
