//! Core ledger and settlement engine.
//!
//! The engine owns every business rule of the expense-splitting domain:
//! deriving net balances from unsettled splits, proposing transfers that
//! would zero them, executing settlements against individual split rows,
//! and the invitation lifecycle that admits members into groups.
//!
//! Every public operation takes the acting user last and runs inside a
//! single database transaction.

pub use error::EngineError;
pub use expense_splits::Split;
pub use expenses::Expense;
pub use group_members::GroupMember;
pub use groups::Group;
pub use invitations::{Invitation, InvitationStatus};
pub use ops::{Engine, EngineBuilder};
pub use settlements::{Settlement, SettlementOutcome, SuggestedTransfer};

mod error;
mod expense_splits;
mod expenses;
mod group_members;
mod groups;
mod invitations;
mod ops;
mod settlements;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
