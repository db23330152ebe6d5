//! Decodes ganglioside names into their structural parts, then works out sugar composition and likely isomers

pub mod errors;
mod identity;
mod isomer;
mod parser;
mod record;
mod sugar;

pub use errors::{NameErrorKind, NameParseError};
pub use identity::{LipidChain, Modifier, Modifiers, ParsedIdentity, Series, SialicClass, UNKNOWN};
pub use isomer::{DataType, UnknownDataType, classify_isomer};
pub use record::{Compound, CompoundRecord};
pub use sugar::{SugarComposition, sugar_composition};
