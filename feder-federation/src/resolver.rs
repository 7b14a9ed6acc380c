//! Field resolvers bound to the merged schema.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::Name;
use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::FederationError;
use crate::json_ext::Object;
use crate::selection::SelectionNode;

/// Identifies a field of the schema: `Type.field`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldCoordinate {
    pub type_name: Name,
    pub field_name: Name,
}

impl FieldCoordinate {
    pub fn new(type_name: Name, field_name: Name) -> Self {
        Self {
            type_name,
            field_name,
        }
    }
}

impl fmt::Display for FieldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// What the execution engine hands a federated resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveContext {
    /// The entity type returned by the field.
    pub field_type: Name,
    /// The selection on that field, with its arguments.
    pub selection: SelectionNode,
}

/// Resolves the partial field map one subgraph contributes to an entity.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    async fn resolve(&self, context: &ResolveContext) -> Result<Object, FederationError>;
}

/// An [`EntityResolver`] and the subgraph it talks to.
#[derive(Clone)]
pub struct SubgraphResolver {
    pub subgraph: Arc<str>,
    pub resolver: Arc<dyn EntityResolver>,
}

impl fmt::Debug for SubgraphResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubgraphResolver({})", self.subgraph)
    }
}

/// The resolver bound to a merged field.
#[derive(Clone, Debug)]
pub enum Resolver {
    Single(SubgraphResolver),
    Composite(CompositeFieldResolver),
}

impl Resolver {
    pub fn single(subgraph: impl Into<Arc<str>>, resolver: Arc<dyn EntityResolver>) -> Self {
        Resolver::Single(SubgraphResolver {
            subgraph: subgraph.into(),
            resolver,
        })
    }

    /// Composes two resolvers. The result is always a flat composite: the resolvers of `self` come
    /// first, then those of `next`.
    pub fn combine(self, next: Resolver) -> Resolver {
        let mut resolvers = self.into_parts();
        resolvers.extend(next.into_parts());
        Resolver::Composite(CompositeFieldResolver { resolvers })
    }

    fn into_parts(self) -> Vec<SubgraphResolver> {
        match self {
            Resolver::Single(single) => vec![single],
            Resolver::Composite(composite) => composite.resolvers,
        }
    }

    /// Names of the subgraphs this resolver calls, in invocation order.
    pub fn subgraphs(&self) -> Vec<&str> {
        match self {
            Resolver::Single(single) => vec![single.subgraph.as_ref()],
            Resolver::Composite(composite) => composite
                .resolvers
                .iter()
                .map(|r| r.subgraph.as_ref())
                .collect(),
        }
    }

    pub async fn resolve(&self, context: &ResolveContext) -> Result<Object, FederationError> {
        match self {
            Resolver::Single(single) => single.resolver.resolve(context).await,
            Resolver::Composite(composite) => composite.resolve(context).await,
        }
    }
}

/// Calls every wrapped resolver with the same context and merges their maps left to right.
#[derive(Clone, Debug)]
pub struct CompositeFieldResolver {
    resolvers: Vec<SubgraphResolver>,
}

impl CompositeFieldResolver {
    pub async fn resolve(&self, context: &ResolveContext) -> Result<Object, FederationError> {
        let partials = try_join_all(
            self.resolvers
                .iter()
                .map(|single| single.resolver.resolve(context)),
        )
        .await?;

        let mut merged = Object::new();
        for partial in partials {
            for (key, value) in partial {
                merged.insert(key, value);
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use apollo_compiler::name;
    use pretty_assertions::assert_eq;
    use serde_json_bytes::Value;
    use serde_json_bytes::json;

    use super::*;
    use crate::error::FederationServiceError;
    use crate::error::ServiceErrorKind;

    struct Fixed {
        fields: Value,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(fields: Value) -> Arc<Self> {
            Arc::new(Self {
                fields,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EntityResolver for Fixed {
        async fn resolve(&self, _context: &ResolveContext) -> Result<Object, FederationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.fields.as_object().cloned().unwrap_or_default())
        }
    }

    struct Failing;

    #[async_trait]
    impl EntityResolver for Failing {
        async fn resolve(&self, _context: &ResolveContext) -> Result<Object, FederationError> {
            Err(FederationServiceError {
                service: "broken".to_string(),
                url: "http://broken".to_string(),
                kind: ServiceErrorKind::NoData,
            }
            .into())
        }
    }

    fn context() -> ResolveContext {
        ResolveContext {
            field_type: name!("Product"),
            selection: SelectionNode::new("product").with_fields(["name"]),
        }
    }

    #[test]
    fn combine_flattens() {
        let a = Resolver::single("a", Fixed::new(json!({})));
        let b = Resolver::single("b", Fixed::new(json!({})));
        let c = Resolver::single("c", Fixed::new(json!({})));

        let combined = a.combine(b).combine(c);

        assert_eq!(combined.subgraphs(), ["a", "b", "c"]);
        let Resolver::Composite(composite) = &combined else {
            panic!("expected a composite resolver");
        };
        assert_eq!(composite.resolvers.len(), 3);
    }

    #[tokio::test]
    async fn later_resolvers_win() {
        let first = Fixed::new(json!({"id": "1", "name": "first"}));
        let second = Fixed::new(json!({"name": "second", "price": 3}));
        let combined = Resolver::single("first", first.clone())
            .combine(Resolver::single("second", second.clone()));

        let merged = combined.resolve(&context()).await.unwrap();

        assert_eq!(
            Value::Object(merged),
            json!({"id": "1", "name": "second", "price": 3})
        );
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn any_failure_fails_the_composite() {
        let combined = Resolver::single("ok", Fixed::new(json!({"name": "x"})))
            .combine(Resolver::single("broken", Arc::new(Failing)));

        let error = combined.resolve(&context()).await.unwrap_err();

        assert_eq!(error.service(), Some("broken"));
    }
}
