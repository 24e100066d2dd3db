pub mod basic_models;
pub mod draft;
pub mod fonts;
pub mod icons;
