pub mod defuser;
pub mod feedback;
pub mod observer;
pub mod round_controller;
