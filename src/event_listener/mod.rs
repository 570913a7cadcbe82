pub mod classifier;
pub mod processor;
pub mod subscription;
pub mod supervisor;

pub use classifier::classify;
pub use processor::FrameProcessor;
pub use subscription::{ControlFrame, SubscriptionManager};
pub use supervisor::{replay_subscriptions, ConnectionState, ConnectionSupervisor};
