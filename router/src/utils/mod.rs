pub mod grain;
