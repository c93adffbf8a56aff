pub mod association;

pub use association::{Associated, Association, AssociationRegistry};
