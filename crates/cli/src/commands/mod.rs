pub mod doctor;
pub mod onboard;
pub mod relay;
pub mod send;
pub mod status;
