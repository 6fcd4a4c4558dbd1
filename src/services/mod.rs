pub mod booking;
pub mod clock;
pub mod notification;
pub mod scheduling;
pub mod validation;
