pub mod configure;
pub mod refresh;
pub mod status;
