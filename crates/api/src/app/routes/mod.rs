pub mod forecast;
pub mod outputs;
pub mod system;
