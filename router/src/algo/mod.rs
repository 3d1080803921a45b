pub mod optimize;
pub mod wavefront;
