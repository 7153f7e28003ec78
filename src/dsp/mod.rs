pub mod level;
pub mod pitch;
