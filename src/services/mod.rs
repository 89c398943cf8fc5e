pub mod drawing;
pub mod room;
