use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, JoinType, QueryFilter, QuerySelect, TransactionTrait, prelude::*};

use crate::{ResultEngine, expense_splits, expenses};

use super::{Engine, with_tx};

impl Engine {
    /// Net balance of `member_id` within a group, recomputed from unsettled
    /// splits on every call. Positive means the member owes the group,
    /// negative means the group owes them. Pure read.
    pub async fn balance(
        &self,
        group_id: &str,
        member_id: &str,
        user_id: &str,
    ) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;
            self.net_balance(&db_tx, group_id, member_id).await
        })
    }

    /// The caller's own balance across several groups in one call.
    ///
    /// Runs the same per-group computation as [`Engine::balance`] inside a
    /// single transaction; results are identical to calling the single-group
    /// form per id.
    pub async fn balances(
        &self,
        group_ids: &[String],
        user_id: &str,
    ) -> ResultEngine<HashMap<String, i64>> {
        with_tx!(self, |db_tx| {
            let mut out = HashMap::with_capacity(group_ids.len());
            for group_id in group_ids {
                self.require_group_member(&db_tx, group_id, user_id).await?;
                let net = self.net_balance(&db_tx, group_id, user_id).await?;
                out.insert(group_id.clone(), net);
            }
            Ok(out)
        })
    }

    /// Sums the member's unsettled debts minus the unsettled splits owed to
    /// them. A payer's own split on their own expense shows up in both sums
    /// and cancels out.
    pub(super) async fn net_balance(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        member_id: &str,
    ) -> ResultEngine<i64> {
        let owed: Vec<expense_splits::Model> = expense_splits::Entity::find()
            .join(JoinType::InnerJoin, expense_splits::Relation::Expenses.def())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .filter(expense_splits::Column::UserId.eq(member_id.to_string()))
            .filter(expense_splits::Column::IsSettled.eq(false))
            .all(db_tx)
            .await?;

        let owed_to: Vec<expense_splits::Model> = expense_splits::Entity::find()
            .join(JoinType::InnerJoin, expense_splits::Relation::Expenses.def())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .filter(expenses::Column::PayerId.eq(member_id.to_string()))
            .filter(expense_splits::Column::IsSettled.eq(false))
            .all(db_tx)
            .await?;

        let debit: i64 = owed.iter().map(|s| s.amount_minor).sum();
        let credit: i64 = owed_to.iter().map(|s| s.amount_minor).sum();
        Ok(debit - credit)
    }
}
