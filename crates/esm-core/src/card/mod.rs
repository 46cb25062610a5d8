//! DataCard model, typed attribute values and page types.

mod attribute;
mod page;
mod record;

pub use attribute::{AttributeValue, FieldSpec, FieldType, encode, encode_fields};
pub use page::{MAX_PAGE_SIZE, Page, PageAnnotation, PageRequest, Template, Visibility};
pub use record::DataCard;
