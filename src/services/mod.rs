pub mod assignment_service;
pub mod class_service;
pub mod event_service;
pub mod identity_service;
pub mod participant_service;
pub mod present_service;
pub mod statistics_service;

pub use assignment_service::AssignmentService;
pub use class_service::ClassService;
pub use event_service::EventService;
pub use identity_service::IdentityService;
pub use participant_service::ParticipantService;
pub use present_service::PresentService;
pub use statistics_service::StatisticsService;
