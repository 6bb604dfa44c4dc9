pub mod explorer;
pub mod selections;
