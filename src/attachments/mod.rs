//! Attachment corpus loading and placement into the two storage roots.

pub mod corpus;
pub mod kind;
pub mod placement;

pub use corpus::{load_corpus, AttachmentSource};
pub use kind::{AttachmentTable, RootKey, SourceKind, SMALL_MAX_BYTES};
pub use placement::{
    logical_key, place_attachments, relative_path, sanitize_segment, select_root,
    select_source_index, AttachmentRoots,
};
