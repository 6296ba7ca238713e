use crate::insight::{Correlation, Emitter, Event, EventStream, Subject};

/// Collects emitted events for assertions.
pub struct EventRecorder {
    emitter: Emitter,
    stream: EventStream,
    seen: Vec<Event>,
}

impl EventRecorder {
    pub fn new(capacity: usize) -> Self {
        let (emitter, stream) = Emitter::channel(capacity, false);
        Self {
            emitter,
            stream,
            seen: Vec::new(),
        }
    }

    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Every event received so far, in emission order.
    pub fn events(&mut self) -> &[Event] {
        while let Some(event) = self.stream.try_next() {
            self.seen.push(event);
        }
        &self.seen
    }

    pub fn subjects(&mut self) -> Vec<Subject> {
        self.events().iter().map(Event::subject).collect()
    }

    pub fn count(&mut self, subject: Subject) -> usize {
        self.events()
            .iter()
            .filter(|event| event.subject() == subject)
            .count()
    }

    pub fn correlations(&mut self) -> Vec<Correlation> {
        let mut all: Vec<Correlation> = Vec::new();
        for event in self.events() {
            if !all.contains(event.correlation()) {
                all.push(event.correlation().clone());
            }
        }
        all
    }
}
