pub mod category;
pub mod item;
pub mod standard_item;
