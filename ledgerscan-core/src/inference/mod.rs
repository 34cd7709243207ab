pub mod model;
pub mod paddle;
pub mod yolo;
