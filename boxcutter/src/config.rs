//! Construction-time wiring for a [`crate::Boxcutter`] facade (spec.md §6:
//! "A `RevisionEngineOptions` value carries: object-schema registry,
//! `fieldOwner` string, `systemPrefix` string...").
use std::sync::Arc;

use boxcutter_core::comparator::{NoSchema, SchemaSource};
use boxcutter_engine::client::KubeReaderWriter;
use boxcutter_engine::{ObjectEngine, PhaseEngine, RevisionEngine};
use kube::Client;
use thiserror::Error;

use crate::Boxcutter;

/// Construction failed because a required field was never set.
#[derive(Debug, Error)]
#[error("boxcutter configuration is incomplete: {0}")]
pub struct ConfigError(String);

/// Builder for [`Boxcutter`]. Every field is required except `schema`,
/// which defaults to [`NoSchema`] (best-effort structural diffing).
#[derive(Default)]
pub struct RevisionEngineOptionsBuilder {
    client: Option<Client>,
    field_owner: Option<String>,
    system_prefix: Option<String>,
    schema: Option<Arc<dyn SchemaSource>>,
}

impl RevisionEngineOptionsBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The Kubernetes client used for both reads and server-side-apply
    /// writes.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// The field-manager identity string stamped on every write.
    pub fn field_owner(mut self, field_owner: impl Into<String>) -> Self {
        self.field_owner = Some(field_owner.into());
        self
    }

    /// The annotation-key prefix used for `owner`/`revision`/`hash`
    /// stamping.
    pub fn system_prefix(mut self, system_prefix: impl Into<String>) -> Self {
        self.system_prefix = Some(system_prefix.into());
        self
    }

    /// Override the discovery source the Comparator uses to walk
    /// lists-by-key. Defaults to [`NoSchema`].
    pub fn schema(mut self, schema: Arc<dyn SchemaSource>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validate and assemble the engine stack.
    pub fn build(self) -> Result<Boxcutter, ConfigError> {
        let client = self.client.ok_or_else(|| ConfigError("client".to_string()))?;
        let field_owner = self.field_owner.filter(|s| !s.is_empty()).ok_or_else(|| ConfigError("field_owner".to_string()))?;
        let system_prefix = self.system_prefix.filter(|s| !s.is_empty()).ok_or_else(|| ConfigError("system_prefix".to_string()))?;
        let schema = self.schema.unwrap_or_else(|| Arc::new(NoSchema));

        let object_engine = ObjectEngine::with_capabilities(
            field_owner,
            Arc::new(boxcutter_core::AnnotationRevisionMetadata::new(system_prefix)),
            schema,
        );
        let engine = RevisionEngine::new(PhaseEngine::new(object_engine));

        Ok(Boxcutter {
            engine,
            client: KubeReaderWriter::new(client),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_field_owner_fails() {
        let result = RevisionEngineOptionsBuilder::new().system_prefix("example.com").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_with_empty_system_prefix_fails() {
        let result = RevisionEngineOptionsBuilder::new().field_owner("boxcutter").system_prefix("").build();
        assert!(result.is_err());
    }
}
