mod container;
mod metadata;
mod title_id;

pub use self::container::{ContainerFile, ContainerKind, Format, ParsedContainer};
pub use self::metadata::GameMetadata;
pub use self::title_id::{ContentKind, TitleId};
