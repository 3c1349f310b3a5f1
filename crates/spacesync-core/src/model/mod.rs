//! Space structure model.
//!
//! Mirrors what the platform exposes for one space: roles, categories and
//! typed channels, plus the create drafts and edit patches sent back to it.

pub mod category;
pub mod channel;
pub mod draft;
pub mod ids;
pub mod overwrite;
pub mod role;
pub mod space;

pub use category::Category;
pub use channel::{Channel, ChannelAttrs, ChannelKind};
pub use draft::{CategoryDraft, ChannelDraft, ChannelPatch, ParentChange, RoleDraft, RolePatch};
pub use ids::{Permissions, PlatformId};
pub use overwrite::{Overwrite, OverwriteTarget};
pub use role::Role;
pub use space::SpaceSnapshot;
