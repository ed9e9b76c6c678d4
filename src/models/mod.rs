pub mod patch;
pub mod response;
pub mod task;
pub mod user;

pub use patch::Patch;
pub use response::ApiResponse;
pub use task::{
    CreateTaskRequest, NewTask, SortField, SortOrder, Task, TaskChanges, TaskFilters,
    TaskPriority, TaskQuery, TaskStats, TaskStatus, UpdateTaskRequest,
};
pub use user::{LoginRequest, NewUser, RegisterRequest, User, UserRecord, UserSummary};
