use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Expense, ResultEngine, Split, expense_splits, expenses};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Records a shared expense with its per-member splits.
    ///
    /// Split amounts must each be positive and sum to the expense amount;
    /// this is the only place the reconciliation invariant is enforced.
    /// Splits start unsettled. Expenses are immutable after creation.
    pub async fn new_expense(
        &self,
        group_id: &str,
        payer_id: &str,
        amount_minor: i64,
        description: Option<&str>,
        splits: &[(String, i64)],
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if splits.is_empty() {
            return Err(EngineError::InvalidAmount(
                "an expense needs at least one split".to_string(),
            ));
        }
        let mut split_total = 0i64;
        for (split_user, split_amount) in splits {
            if *split_amount <= 0 {
                return Err(EngineError::InvalidAmount(format!(
                    "split for {split_user} must be > 0"
                )));
            }
            split_total += *split_amount;
        }
        if split_total != amount_minor {
            return Err(EngineError::InvalidAmount(format!(
                "split amounts sum to {split_total}, expense is {amount_minor}"
            )));
        }
        let description = normalize_optional_text(description);

        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;
            if self
                .group_membership_role(&db_tx, group_id, payer_id)
                .await?
                .is_none()
            {
                return Err(EngineError::NotAMember(payer_id.to_string()));
            }
            for (split_user, _) in splits {
                if self
                    .group_membership_role(&db_tx, group_id, split_user)
                    .await?
                    .is_none()
                {
                    return Err(EngineError::NotAMember(split_user.clone()));
                }
            }

            let expense_id = Uuid::new_v4();
            let now = Utc::now();
            expenses::ActiveModel {
                id: ActiveValue::Set(expense_id.to_string()),
                group_id: ActiveValue::Set(group_id.to_string()),
                payer_id: ActiveValue::Set(payer_id.to_string()),
                amount_minor: ActiveValue::Set(amount_minor),
                description: ActiveValue::Set(description.clone()),
                created_at: ActiveValue::Set(now),
            }
            .insert(&db_tx)
            .await?;

            for (split_user, split_amount) in splits {
                expense_splits::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    expense_id: ActiveValue::Set(expense_id.to_string()),
                    user_id: ActiveValue::Set(split_user.clone()),
                    amount_minor: ActiveValue::Set(*split_amount),
                    is_settled: ActiveValue::Set(false),
                    settled_at: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(now),
                }
                .insert(&db_tx)
                .await?;
            }

            Ok(expense_id)
        })
    }

    /// Lists a group's expenses with their splits, oldest first.
    pub async fn list_group_expenses(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let rows = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(expenses::Column::CreatedAt)
                .order_by_asc(expenses::Column::Id)
                .find_with_related(expense_splits::Entity)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (expense_model, split_models) in rows {
                let mut expense = Expense::try_from(expense_model)?;
                for split_model in split_models {
                    expense.splits.push(Split::try_from(split_model)?);
                }
                out.push(expense);
            }
            Ok(out)
        })
    }
}
