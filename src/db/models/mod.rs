pub mod care;
pub mod patient;
pub mod reading;
pub mod token;
pub mod warning;

pub use care::{AlertPolicy, CareRelation, RelationKind};
pub use patient::Patient;
pub use reading::GlucoseReading;
pub use token::PushToken;
pub use warning::{NotificationRecord, WarningLevel};
