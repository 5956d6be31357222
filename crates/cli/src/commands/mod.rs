pub mod recording;
pub mod status;
