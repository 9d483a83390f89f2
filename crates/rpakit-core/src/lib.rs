//! rpakit: a reader/writer for Ren'Py-style `.rpa` game archives.
//!
//! Composition order mirrors the on-disk dependency chain: `io_util` and
//! `zlib` are the byte-level primitives, `pickle` decodes/encodes the
//! index's serialized form, `header` and `index` parse the archive's own
//! framing, and `reader`/`writer` compose all of the above into the public
//! API. `classifier` is a standalone, read-only inspector over extracted
//! compiled-script files.

pub mod classifier;
pub mod error;
pub mod header;
pub mod index;
pub mod io_util;
pub mod pickle;
pub mod progress;
pub mod reader;
pub mod serializer;
pub mod writer;
pub mod zlib;

pub use classifier::{classify, Classification};
pub use error::{RpaError, Result};
pub use header::{Family, Header};
pub use index::{Entry as IndexEntry, Index};
pub use progress::{NoProgress, ProgressReport, Stage};
pub use reader::{ArchiveReader, Decompiler, ExtractSummary};
pub use writer::{ArchiveWriter, SerializerMode, WriterOptions};
