use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::engine::errors::UsageError;
use crate::shared::media::media_type::MediaType;

const LOG_TARGET: &str = "shared::media::resolver";

type Supplier<T> = Arc<dyn Fn() -> T + Send + Sync>;

struct Canonical<T> {
    supplier: Supplier<T>,
    canonical: MediaType,
}

impl<T> Clone for Canonical<T> {
    fn clone(&self) -> Self {
        Self {
            supplier: Arc::clone(&self.supplier),
            canonical: self.canonical.clone(),
        }
    }
}

/// Maps media type patterns to formatter factories and resolves a client's
/// acceptable types to the best registered one.
///
/// Client entries are evaluated in preference order; for each entry the first
/// registered pattern it accepts wins. Registration order is therefore the
/// tie-break among equally specific patterns.
pub struct TypeMatchingResolver<T> {
    registered: Vec<(MediaType, Canonical<T>)>,
}

/// The outcome of a successful resolution.
pub struct Selection<T> {
    pub value: T,
    /// The type the formatter produces, i.e. its primary registration.
    pub media_type: MediaType,
    /// The registered pattern (primary or alias) that matched.
    pub matched: MediaType,
}

impl<T> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("media_type", &self.media_type)
            .field("matched", &self.matched)
            .finish()
    }
}

impl<T> TypeMatchingResolver<T> {
    pub fn builder() -> ResolverBuilder<T> {
        ResolverBuilder {
            registered: Vec::new(),
            active: None,
        }
    }

    pub fn select(&self, acceptable: &[MediaType]) -> Result<Selection<T>, UsageError> {
        for candidate in acceptable {
            if let Some((key, found)) = self
                .registered
                .iter()
                .find(|(key, _)| candidate.accepts(key))
            {
                trace!(target: LOG_TARGET, requested = %candidate, matched = %key, "Resolved media type");
                return Ok(Selection {
                    value: (found.supplier)(),
                    media_type: found.canonical.clone(),
                    matched: key.clone(),
                });
            }
        }
        Err(UsageError::NoMatchingFormat {
            accepted: join(acceptable.iter()),
            registered: join(self.registered.iter().map(|(key, _)| key)),
        })
    }

    /// All registered patterns in registration order.
    pub fn registered(&self) -> impl Iterator<Item = &MediaType> {
        self.registered.iter().map(|(key, _)| key)
    }
}

fn join<'a>(types: impl Iterator<Item = &'a MediaType>) -> String {
    let rendered: Vec<String> = types.map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

pub struct ResolverBuilder<T> {
    registered: Vec<(MediaType, Canonical<T>)>,
    active: Option<Canonical<T>>,
}

impl<T> ResolverBuilder<T> {
    /// Registers a factory under its primary media type.
    pub fn register<F>(mut self, primary: MediaType, supplier: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let canonical = Canonical {
            supplier: Arc::new(supplier),
            canonical: primary.clone(),
        };
        self.active = Some(canonical.clone());
        self.push(primary, canonical);
        self
    }

    /// Adds another pattern resolving to the most recently registered factory.
    ///
    /// # Panics
    /// If no factory was registered yet.
    pub fn alias(mut self, alias: MediaType) -> Self {
        let active = self
            .active
            .clone()
            .expect("must register a primary type before aliasing");
        self.push(alias, active);
        self
    }

    pub fn build(self) -> TypeMatchingResolver<T> {
        TypeMatchingResolver {
            registered: self.registered,
        }
    }

    fn push(&mut self, key: MediaType, canonical: Canonical<T>) {
        // the first registration of a pattern wins, later duplicates are unreachable
        if self.registered.iter().any(|(existing, _)| *existing == key) {
            return;
        }
        self.registered.push((key, canonical));
    }
}
