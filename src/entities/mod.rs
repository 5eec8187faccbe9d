pub mod assignments;
pub mod classes;
pub mod events;
pub mod participants;
pub mod presents;
pub mod users;

pub use assignments as assignment_entity;
pub use classes as class_entity;
pub use events as event_entity;
pub use participants as participant_entity;
pub use presents as present_entity;
pub use users as user_entity;

pub use participants::ParticipantStatus;
pub use presents::PresentStatus;
pub use users::UserRole;
