//! Domain model (keys, desired state, status, values, errors, decisions, ...).

pub mod decision;
pub mod desired;
pub mod errors;
pub mod events;
pub mod ids;
pub mod key;
pub mod kind;
pub mod outcome;
pub mod release;
pub mod retry;
pub mod status;
pub mod values;

pub use self::decision::{Decider, Decision, DefaultDecider};
pub use self::desired::{AssistantSpec, DesiredState, Replicas, ResourceVersion};
pub use self::errors::{ErrorKind, ReconcileError};
pub use self::events::{ReconcileEvent, ReconcileEventKind};
pub use self::ids::ReconcileId;
pub use self::key::ReleaseKey;
pub use self::kind::GroupVersionKind;
pub use self::outcome::ReconcileOutcome;
pub use self::release::{ReleaseHandle, UpgradeResult};
pub use self::retry::RetryPolicy;
pub use self::status::{ObservedStatus, Phase};
pub use self::values::{Value, ValueMapping, map_values};
