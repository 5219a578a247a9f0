//! Request/response types shared by the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupsResponse {
        pub groups: Vec<GroupView>,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user in a group.
    ///
    /// The server treats roles as:
    /// - `admin`: can manage members and invitations.
    /// - `member`: can log expenses, read balances and settle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipRole {
        Admin,
        Member,
    }

    impl MembershipRole {
        /// Returns the canonical role string used by the engine/database.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Admin => "admin",
                Self::Member => "member",
            }
        }
    }

    /// Request body for adding/updating a member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberUpsert {
        pub username: String,
        pub role: MembershipRole,
    }

    /// Response body for listing members.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }

    /// A member with their role.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub username: String,
        pub role: MembershipRole,
        pub joined_at: DateTime<Utc>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub user_id: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        /// Defaults to the authenticated caller.
        pub payer_id: Option<String>,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub splits: Vec<SplitNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub id: Uuid,
        pub user_id: String,
        pub amount_minor: i64,
        pub is_settled: bool,
        pub settled_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub payer_id: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub splits: Vec<SplitView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesResponse {
        pub expenses: Vec<ExpenseView>,
    }
}

pub mod balance {
    use super::*;

    /// Signed net balance: positive = the user owes the group, negative =
    /// the group owes the user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceResponse {
        pub group_id: String,
        pub user_id: String,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupBalance {
        pub group_id: String,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<GroupBalance>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionView {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestionsResponse {
        pub suggestions: Vec<SuggestionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleNew {
        pub from_user: String,
        pub to_user: String,
        pub amount_minor: i64,
        pub note: Option<String>,
    }

    /// `remaining_minor > 0` means there was less settleable debt than
    /// requested; it is not an error.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleOutcome {
        pub settlement_id: Option<Uuid>,
        pub settled_split_ids: Vec<Uuid>,
        pub settled_minor: i64,
        pub remaining_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub id: Uuid,
        pub payer_id: String,
        pub receiver_id: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementsResponse {
        pub settlements: Vec<SettlementView>,
    }
}

pub mod invitation {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationNew {
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationCreated {
        pub id: Uuid,
        pub token: String,
        pub expires_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvitationStatus {
        Pending,
        Accepted,
        Expired,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationView {
        pub id: Uuid,
        pub invitee_email: String,
        pub status: InvitationStatus,
        pub created_at: DateTime<Utc>,
        pub expires_at: DateTime<Utc>,
        pub accepted_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationsResponse {
        pub invitations: Vec<InvitationView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationAccept {
        pub token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationAccepted {
        pub group_id: String,
    }
}
