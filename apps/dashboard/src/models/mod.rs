pub mod job;
pub mod resume;
pub mod task;
pub mod user;

pub use job::{ApplyRequest, ApplyResponse, FindJobsResponse, Job};
pub use resume::ResumeParseResult;
pub use task::{StartApplicationRequest, StartApplicationResponse, TaskState, TaskStatus};
pub use user::{
    AuthResponse, ProfileEnvelope, ProfileUpdate, SignInRequest, SignUpRequest, Skill, UserProfile,
};
