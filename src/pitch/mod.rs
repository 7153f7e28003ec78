pub mod stabilizer;
pub mod stages;
