//! Fluent assembly of [Spec]s.
//!
//! Every combinator reduces to [SpecBuilder::should_continue], which appends a
//! raw [DecodeStep]. Steps run in the order they were added.

use std::sync::Arc;

use crate::{
    bit_reader::BitReader,
    errors::DecodeError,
    spec::Spec,
    step::{DecodeStep, Guard},
    tree::{NamedTree, TreeView},
    value::Value,
};

/// Mutable accumulator of steps. [SpecBuilder::build] snapshots it into an
/// immutable [Spec]; the builder stays usable afterwards.
#[derive(Clone, Default)]
pub struct SpecBuilder {
    name: Option<String>,
    steps: Vec<DecodeStep>,
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the spec. Named specs nest their result under the name when used
    /// as a sub-spec; an empty name clears it.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = non_empty(name.into());
        self
    }

    /// Appends all steps of `other`, as if they had been added here.
    pub fn with(&mut self, other: &SpecBuilder) -> &mut Self {
        self.steps.extend(other.steps.iter().cloned());
        self
    }

    /// Runs `fragment` on this builder.
    pub fn apply(&mut self, fragment: impl FnOnce(&mut SpecBuilder)) -> &mut Self {
        fragment(self);
        self
    }

    /// Runs all steps of `spec` as one step, writing its fields flat into the
    /// current tree. An early exit inside `spec` only ends `spec`.
    pub fn import(&mut self, spec: impl Into<Spec>) -> &mut Self {
        let spec = spec.into();
        self.special(move |reader, tree| spec.decode_into(reader, tree))
    }

    /// Finishes the current byte, then skips the number of bytes `amount` returns.
    pub fn discard_bytes<F>(&mut self, amount: F) -> &mut Self
    where
        F: Fn(&mut BitReader<'_>, TreeView<'_>) -> Result<usize, DecodeError>
            + Send
            + Sync
            + 'static,
    {
        self.special(move |reader, tree| {
            reader.finish_byte()?;

            let count = amount(reader, tree.get_immutable())?;
            reader.skip_bytes(count)?;

            Ok(())
        })
    }

    /// Adds a two-way branch. See [Branch].
    pub fn branch(&mut self, branch: Branch) -> &mut Self {
        let Branch {
            guard,
            record,
            when_true,
            when_false,
        } = branch;

        self.special(move |reader, tree| {
            let outcome = guard.check(reader, tree.get_immutable())?;

            if let Some(record) = &record {
                let value = match &record.labeler {
                    Some(labeler) => labeler(outcome),
                    None => Value::Bool(outcome),
                };
                tree.put(record.name.clone(), value);
            }

            let chosen = if outcome { &when_true } else { &when_false };
            if let Some(spec) = chosen {
                decode_sub_spec(spec, reader, tree)?;
            }

            Ok(())
        })
    }

    /// Adds `spec` as a sub-spec. A named spec decodes into its own tree
    /// stored under its name; an unnamed one is spliced like [SpecBuilder::import].
    pub fn nested(&mut self, spec: impl Into<Spec>) -> &mut Self {
        self.nested_if(Guard::Always, spec)
    }

    /// Like [SpecBuilder::nested], but only decodes when `guard` passes.
    /// Otherwise nothing is written at all.
    pub fn nested_if(&mut self, guard: Guard, spec: impl Into<Spec>) -> &mut Self {
        let spec = spec.into();

        match spec.name().map(str::to_string) {
            Some(name) => self.nested_as(name, guard, spec),
            None => self.special(move |reader, tree| {
                if guard.check(reader, tree.get_immutable())? {
                    spec.decode_into(reader, tree)?;
                }
                Ok(())
            }),
        }
    }

    /// Decodes `spec` into its own tree stored under `name`, whatever the
    /// spec's own name is. Absent when `guard` fails.
    pub fn nested_as(
        &mut self,
        name: impl Into<String>,
        guard: Guard,
        spec: impl Into<Spec>,
    ) -> &mut Self {
        let name = name.into();
        let spec = spec.into();

        self.special(move |reader, tree| {
            if guard.check(reader, tree.get_immutable())? {
                let sub_tree = spec.decode_reader(reader)?;
                tree.put(name.clone(), sub_tree);
            }
            Ok(())
        })
    }

    /// Decodes one value and stores it under `name`.
    ///
    /// `decoder` sees the fields decoded so far through a read-only view.
    pub fn field<V, F>(&mut self, name: impl Into<String>, decoder: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&mut BitReader<'_>, TreeView<'_>) -> Result<V, DecodeError> + Send + Sync + 'static,
    {
        self.field_if(name, Guard::Always, decoder)
    }

    /// Like [SpecBuilder::field], but the key stays absent when `guard` fails.
    pub fn field_if<V, F>(&mut self, name: impl Into<String>, guard: Guard, decoder: F) -> &mut Self
    where
        V: Into<Value>,
        F: Fn(&mut BitReader<'_>, TreeView<'_>) -> Result<V, DecodeError> + Send + Sync + 'static,
    {
        let name = name.into();

        self.special(move |reader, tree| {
            if guard.check(reader, tree.get_immutable())? {
                let value: Value = decoder(reader, tree.get_immutable())?.into();
                tree.put(name.clone(), value);
            }
            Ok(())
        })
    }

    /// Runs `consumer` against the reader without storing anything.
    pub fn read_data<F>(&mut self, consumer: F) -> &mut Self
    where
        F: Fn(&mut BitReader<'_>) -> Result<(), DecodeError> + Send + Sync + 'static,
    {
        self.special(move |reader, _| consumer(reader))
    }

    /// Adds a step with full access to the reader and the tree that always continues.
    pub fn special<F>(&mut self, decoder: F) -> &mut Self
    where
        F: Fn(&mut BitReader<'_>, &mut NamedTree) -> Result<(), DecodeError>
            + Send
            + Sync
            + 'static,
    {
        self.should_continue(move |reader, tree| {
            decoder(reader, tree)?;
            Ok(true)
        })
    }

    /// Fails the decode with `message` unless `check` holds for the reader.
    pub fn assert_reader<F>(&mut self, check: F, message: impl Into<String>) -> &mut Self
    where
        F: Fn(&BitReader<'_>) -> bool + Send + Sync + 'static,
    {
        let message = message.into();

        self.special(move |reader, _| {
            if check(reader) {
                return Ok(());
            }
            Err(assertion_failed(&message))
        })
    }

    /// Fails the decode with `message` unless `check` holds for the fields decoded so far.
    pub fn assert_data<F>(&mut self, check: F, message: impl Into<String>) -> &mut Self
    where
        F: Fn(TreeView<'_>) -> bool + Send + Sync + 'static,
    {
        let message = message.into();

        self.special(move |_, tree| {
            if check(tree.get_immutable()) {
                return Ok(());
            }
            Err(assertion_failed(&message))
        })
    }

    /// Fails the decode with `message` unless `check` holds for the most
    /// recently written value (`None` if nothing was written yet).
    pub fn assert_previous<F>(&mut self, check: F, message: impl Into<String>) -> &mut Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        let message = message.into();

        self.special(move |_, tree| {
            let previous = tree.last_modified().and_then(|key| tree.get(key));
            if check(previous) {
                return Ok(());
            }
            Err(assertion_failed(&message))
        })
    }

    /// Appends a raw step. Returning `false` stops the spec being built.
    pub fn should_continue<F>(&mut self, step: F) -> &mut Self
    where
        F: Fn(&mut BitReader<'_>, &mut NamedTree) -> Result<bool, DecodeError>
            + Send
            + Sync
            + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Independent builder holding the steps added so far.
    pub fn copy(&self) -> SpecBuilder {
        self.clone()
    }

    pub fn build(&self) -> Spec {
        Spec::from_steps(self.name.clone(), self.steps.clone())
    }
}

/// A two-way branch for [SpecBuilder::branch].
///
/// The guard is evaluated once. Its outcome can be recorded under a name,
/// either as a [Value::Bool] or mapped to a label. Then the matching sub-spec,
/// if any, is decoded: named sub-specs nest under their name, unnamed ones are
/// spliced into the current tree.
///
/// ```
/// use bitstep::{builder::Branch, spec::Spec, step::Guard};
///
/// let extended = Spec::define(|b| {
///     b.field("extra", |r, _| Ok(r.read_few_bits(4)?));
/// });
///
/// let spec = Spec::define(|b| {
///     b.branch(
///         Branch::on(Guard::flag())
///             .record_as("mode", |ext| if ext { "extended" } else { "basic" })
///             .then(extended),
///     );
/// });
///
/// let tree = spec.decode(&[0b1101_0000]).unwrap();
/// assert_eq!(tree.get("mode").and_then(|v| v.as_str()), Some("extended"));
/// assert_eq!(tree.get("extra").and_then(|v| v.as_u64()), Some(0b1010));
/// ```
#[derive(Clone)]
pub struct Branch {
    guard: Guard,
    record: Option<Record>,
    when_true: Option<Spec>,
    when_false: Option<Spec>,
}

#[derive(Clone)]
struct Record {
    name: String,
    labeler: Option<Arc<dyn Fn(bool) -> Value + Send + Sync>>,
}

impl Branch {
    pub fn on(guard: Guard) -> Self {
        Branch {
            guard,
            record: None,
            when_true: None,
            when_false: None,
        }
    }

    /// Stores the outcome as a [Value::Bool] under `name`. An empty `name`
    /// records nothing.
    pub fn record(mut self, name: impl Into<String>) -> Self {
        self.record = non_empty(name.into()).map(|name| Record { name, labeler: None });
        self
    }

    /// Stores `labeler(outcome)` under `name`. An empty `name` records nothing.
    pub fn record_as<V, F>(mut self, name: impl Into<String>, labeler: F) -> Self
    where
        V: Into<Value>,
        F: Fn(bool) -> V + Send + Sync + 'static,
    {
        self.record = non_empty(name.into()).map(|name| Record {
            name,
            labeler: Some(Arc::new(move |outcome| labeler(outcome).into())),
        });
        self
    }

    pub fn then(mut self, spec: impl Into<Spec>) -> Self {
        self.when_true = Some(spec.into());
        self
    }

    pub fn otherwise(mut self, spec: impl Into<Spec>) -> Self {
        self.when_false = Some(spec.into());
        self
    }
}

fn decode_sub_spec(
    spec: &Spec,
    reader: &mut BitReader<'_>,
    tree: &mut NamedTree,
) -> Result<(), DecodeError> {
    match spec.name() {
        Some(name) => {
            let sub_tree = spec.decode_reader(reader)?;
            tree.put(name, sub_tree);
        }
        None => spec.decode_into(reader, tree)?,
    }

    Ok(())
}

fn assertion_failed(message: &str) -> DecodeError {
    tracing::debug!(reason = message, "decode assertion failed");
    DecodeError::Assertion(message.to_string())
}

fn non_empty(name: String) -> Option<String> {
    (!name.is_empty()).then_some(name)
}
