pub mod capture;
pub mod ring_buffer;
