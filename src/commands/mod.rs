pub mod help;
pub mod player;
