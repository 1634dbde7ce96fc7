//! Pasos concretos de cada versión publicada del sistema de juego.
pub mod actor_traits;
pub mod character_experience;
pub mod item_identification;
pub mod item_quantity;
pub mod sheet_housekeeping;

pub use actor_traits::ActorTraitsToList;
pub use character_experience::CharacterExperience;
pub use item_identification::ItemIdentification;
pub use item_quantity::ItemQuantityRename;
pub use sheet_housekeeping::SheetHousekeeping;
