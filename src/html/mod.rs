pub(crate) mod entities;
mod names;

pub use self::names::{attr_name, tag_name, AttrId, DefaultInterner, NameInterner, TagId};
