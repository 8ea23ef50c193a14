pub mod dispatcher;

pub use dispatcher::SchedulerHandle;
