//! Spec: immutable, reusable sequence of [DecodeStep]s and the engine that runs it.

use std::{fmt, sync::Arc};

use crate::{
    bit_reader::BitReader,
    builder::SpecBuilder,
    errors::DecodeError,
    step::DecodeStep,
    tree::NamedTree,
};

/// A built spec. Use [Spec::builder] to assemble one, then decode as many
/// buffers as needed; cloning is cheap and the steps are shared.
///
/// A spec holds no mutable state, so it can decode on several threads at
/// once as long as every decode has its own reader and tree.
#[derive(Clone)]
pub struct Spec {
    name: Option<String>,
    steps: Arc<[DecodeStep]>,
}

impl Spec {
    pub fn builder() -> SpecBuilder {
        SpecBuilder::new()
    }

    /// Builds an unnamed spec from an inline fragment.
    pub fn define(fragment: impl FnOnce(&mut SpecBuilder)) -> Spec {
        let mut builder = SpecBuilder::new();
        fragment(&mut builder);
        builder.build()
    }

    pub(crate) fn from_steps(name: Option<String>, steps: Vec<DecodeStep>) -> Self {
        Spec {
            name,
            steps: steps.into(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// Decodes `data` from its first byte.
    pub fn decode(&self, data: &[u8]) -> Result<NamedTree, DecodeError> {
        self.decode_reader(&mut BitReader::new(data))
    }

    /// Decodes `data` starting at byte `offset`.
    pub fn decode_at(&self, data: &[u8], offset: usize) -> Result<NamedTree, DecodeError> {
        self.decode_reader(&mut BitReader::at(data, offset)?)
    }

    /// Decodes into a fresh tree, continuing from the reader's position.
    pub fn decode_reader(&self, reader: &mut BitReader<'_>) -> Result<NamedTree, DecodeError> {
        let mut tree = NamedTree::new();
        self.decode_into(reader, &mut tree)?;

        Ok(tree)
    }

    /// Runs the steps in order against an existing tree.
    ///
    /// The first step reporting `false` ends this spec without an error;
    /// everything decoded up to that point is kept.
    pub fn decode_into(
        &self,
        reader: &mut BitReader<'_>,
        tree: &mut NamedTree,
    ) -> Result<(), DecodeError> {
        let spec = self.name.as_deref().unwrap_or("");
        let _span = tracing::trace_span!("decode", spec).entered();

        for (index, step) in self.steps.iter().enumerate() {
            if !step(reader, tree)? {
                tracing::trace!(
                    step = index,
                    byte_index = reader.byte_index(),
                    bit_index = reader.bit_index(),
                    "spec stopped early"
                );
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spec")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl From<SpecBuilder> for Spec {
    fn from(builder: SpecBuilder) -> Self {
        builder.build()
    }
}

impl From<&SpecBuilder> for Spec {
    fn from(builder: &SpecBuilder) -> Self {
        builder.build()
    }
}

impl From<&Spec> for Spec {
    fn from(spec: &Spec) -> Self {
        spec.clone()
    }
}
