pub mod appointment;
pub mod caregiver;
pub mod elder;
pub mod invite;
pub mod note;

pub use appointment::{Appointment, AppointmentWithResponse};
pub use caregiver::{Caregiver, CaregiverProfile, CareTeamMember};
pub use elder::Elder;
pub use invite::Invite;
pub use note::{Note, NoteWithAuthor};
