pub mod links;
pub mod nodes;
