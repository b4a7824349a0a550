//! The unit of composition of a [crate::spec::Spec] and the guards that make
//! steps conditional.

use std::{fmt, sync::Arc};

use crate::{
    bit_reader::BitReader,
    errors::DecodeError,
    tree::{NamedTree, TreeView},
};

/// One step of a spec: may advance the reader and write to the tree, then
/// reports whether the remaining steps should run.
pub type DecodeStep =
    Arc<dyn Fn(&mut BitReader<'_>, &mut NamedTree) -> Result<bool, DecodeError> + Send + Sync>;

type ReaderPredicate = dyn Fn(&mut BitReader<'_>) -> Result<bool, DecodeError> + Send + Sync;
type TreePredicate =
    dyn Fn(&mut BitReader<'_>, TreeView<'_>) -> Result<bool, DecodeError> + Send + Sync;

/// Condition deciding whether a guarded step runs.
///
/// Predicates may consume bits, which is how presence flags are usually read.
#[derive(Clone, Default)]
pub enum Guard {
    #[default]
    Always,
    /// Looks at the reader only.
    Reader(Arc<ReaderPredicate>),
    /// Looks at the reader and the fields decoded so far.
    Tree(Arc<TreePredicate>),
}

impl Guard {
    pub fn reader<F>(predicate: F) -> Self
    where
        F: Fn(&mut BitReader<'_>) -> Result<bool, DecodeError> + Send + Sync + 'static,
    {
        Guard::Reader(Arc::new(predicate))
    }

    pub fn tree<F>(predicate: F) -> Self
    where
        F: Fn(&mut BitReader<'_>, TreeView<'_>) -> Result<bool, DecodeError>
            + Send
            + Sync
            + 'static,
    {
        Guard::Tree(Arc::new(predicate))
    }

    /// Guard on a single flag bit read from the stream.
    pub fn flag() -> Self {
        Guard::reader(|reader| Ok(reader.read_bit()?))
    }

    pub fn check(
        &self,
        reader: &mut BitReader<'_>,
        tree: TreeView<'_>,
    ) -> Result<bool, DecodeError> {
        match self {
            Guard::Always => Ok(true),
            Guard::Reader(predicate) => predicate(reader),
            Guard::Tree(predicate) => predicate(reader, tree),
        }
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Always => f.write_str("Always"),
            Guard::Reader(_) => f.write_str("Reader(..)"),
            Guard::Tree(_) => f.write_str("Tree(..)"),
        }
    }
}
