pub mod booking;
pub mod business_hours;
pub mod service;

pub use booking::{minutes_of_day, Booking, BookingStatus, NewBooking};
pub use business_hours::{BusinessHours, LunchBreak};
pub use service::Service;
