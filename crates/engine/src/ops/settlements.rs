//! Settlement planning and execution.
//!
//! The planner is a pure greedy over the group's balance vector; the
//! executor fills a requested amount against locked, oldest-first unsettled
//! splits, settling only whole splits.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DbErr, JoinType, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Settlement, SettlementOutcome, SuggestedTransfer, expense_splits,
    expenses, group_members, settlements,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Suggested transfers below this many minor units are dropped as noise.
const MIN_TRANSFER_MINOR: i64 = 10;

impl Engine {
    /// Proposes transfers that would zero out the group's balances.
    ///
    /// Advisory only: nothing is mutated, and a caller applies a suggestion
    /// by invoking [`Engine::settle`] with whatever values it chooses. The
    /// balance vector is built in members-list order (joined_at, then
    /// user_id), which makes the plan deterministic.
    pub async fn suggest_settlements(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<SuggestedTransfer>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let members = group_members::Entity::find()
                .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(group_members::Column::JoinedAt)
                .order_by_asc(group_members::Column::UserId)
                .all(&db_tx)
                .await?;

            let mut balances = Vec::with_capacity(members.len());
            for member in &members {
                let net = self.net_balance(&db_tx, group_id, &member.user_id).await?;
                balances.push((member.user_id.clone(), net));
            }

            Ok(plan_transfers(&balances))
        })
    }

    /// Records that `from_user` paid `to_user` up to `amount_minor`,
    /// settling that debtor's oldest whole splits first.
    ///
    /// Splits are indivisible: the walk stops at the first split that does
    /// not fit in the remaining amount, and the unapplied remainder comes
    /// back in the outcome as a benign value, not an error. The candidate
    /// rows are locked for the duration of the transaction so two
    /// concurrent settlements cannot consume the same split twice.
    pub async fn settle(
        &self,
        group_id: &str,
        from_user: &str,
        to_user: &str,
        amount_minor: i64,
        note: Option<&str>,
        user_id: &str,
    ) -> ResultEngine<SettlementOutcome> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }
        if from_user == to_user {
            return Err(EngineError::SameParty(
                "payer and receiver must differ".to_string(),
            ));
        }
        if user_id != from_user && user_id != to_user {
            return Err(EngineError::Forbidden(
                "only a settlement's participants may record it".to_string(),
            ));
        }
        let note = normalize_optional_text(note);

        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;
            for party in [from_user, to_user] {
                if self
                    .group_membership_role(&db_tx, group_id, party)
                    .await?
                    .is_none()
                {
                    return Err(EngineError::NotAMember(party.to_string()));
                }
            }

            let candidates: Vec<expense_splits::Model> = expense_splits::Entity::find()
                .join(JoinType::InnerJoin, expense_splits::Relation::Expenses.def())
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .filter(expenses::Column::PayerId.eq(to_user.to_string()))
                .filter(expense_splits::Column::UserId.eq(from_user.to_string()))
                .filter(expense_splits::Column::IsSettled.eq(false))
                .order_by_asc(expense_splits::Column::CreatedAt)
                .order_by_asc(expense_splits::Column::Id)
                .lock_exclusive()
                .all(&db_tx)
                .await?;

            let now = Utc::now();
            let mut remaining = amount_minor;
            let mut settled_total = 0i64;
            let mut settled_ids = Vec::new();

            for split in candidates {
                // Whole splits only: stop at the first one that does not fit.
                if split.amount_minor > remaining {
                    break;
                }
                remaining -= split.amount_minor;
                settled_total += split.amount_minor;
                settled_ids.push(
                    Uuid::parse_str(&split.id)
                        .map_err(|_| EngineError::KeyNotFound("split not exists".to_string()))?,
                );

                expense_splits::ActiveModel {
                    id: ActiveValue::Set(split.id),
                    is_settled: ActiveValue::Set(true),
                    settled_at: ActiveValue::Set(Some(now)),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
            }

            let mut settlement_id = None;
            if settled_total > 0 {
                let id = Uuid::new_v4();
                let audit = settlements::ActiveModel {
                    id: ActiveValue::Set(id.to_string()),
                    group_id: ActiveValue::Set(group_id.to_string()),
                    payer_id: ActiveValue::Set(from_user.to_string()),
                    receiver_id: ActiveValue::Set(to_user.to_string()),
                    amount_minor: ActiveValue::Set(settled_total),
                    description: ActiveValue::Set(note.clone()),
                    created_at: ActiveValue::Set(now),
                };
                match audit.insert(&db_tx).await {
                    Ok(_) => settlement_id = Some(id),
                    // The settled splits are the source of truth for
                    // balances; a constraint-violating audit row must not
                    // undo them.
                    Err(err) if is_constraint_violation(&err) => {
                        tracing::warn!(
                            group_id,
                            payer = from_user,
                            receiver = to_user,
                            amount = settled_total,
                            "settlement audit insert failed: {err}"
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            Ok(SettlementOutcome {
                settlement_id,
                settled_split_ids: settled_ids,
                settled_minor: settled_total,
                remaining_minor: remaining,
            })
        })
    }

    /// Settlement history of a group, newest first (any member may read).
    pub async fn list_group_settlements(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let rows = settlements::Entity::find()
                .filter(settlements::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(settlements::Column::CreatedAt)
                .order_by_desc(settlements::Column::Id)
                .all(&db_tx)
                .await?;
            rows.into_iter().map(Settlement::try_from).collect()
        })
    }
}

fn is_constraint_violation(err: &DbErr) -> bool {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_))
        | Some(SqlErr::ForeignKeyConstraintViolation(_)) => true,
        // sqlite reports CHECK failures as a plain execution error.
        _ => err.to_string().contains("CHECK constraint failed"),
    }
}

/// Greedy debt simplification over a balance vector.
///
/// Repeatedly matches the largest outstanding debtor (net > 0) against the
/// largest outstanding creditor, transfers the smaller of the two, and
/// repeats. At most n−1 transfers for n participants; ties resolve to the
/// earlier entry in the input, so output is deterministic for a fixed
/// member order. Transfers under [`MIN_TRANSFER_MINOR`] are dropped after
/// planning, so the rest of the plan still zeroes every balance it touches.
fn plan_transfers(balances: &[(String, i64)]) -> Vec<SuggestedTransfer> {
    let mut debtors: Vec<(usize, i64)> = Vec::new();
    let mut creditors: Vec<(usize, i64)> = Vec::new();
    for (idx, (_, net)) in balances.iter().enumerate() {
        if *net > 0 {
            debtors.push((idx, *net));
        } else if *net < 0 {
            creditors.push((idx, -*net));
        }
    }

    let mut out = Vec::new();
    while !debtors.is_empty() && !creditors.is_empty() {
        let di = index_of_largest(&debtors);
        let ci = index_of_largest(&creditors);
        let amount = debtors[di].1.min(creditors[ci].1);

        out.push(SuggestedTransfer {
            from: balances[debtors[di].0].0.clone(),
            to: balances[creditors[ci].0].0.clone(),
            amount_minor: amount,
        });

        debtors[di].1 -= amount;
        creditors[ci].1 -= amount;
        if debtors[di].1 == 0 {
            debtors.remove(di);
        }
        if creditors[ci].1 == 0 {
            creditors.remove(ci);
        }
    }

    out.retain(|t| t.amount_minor >= MIN_TRANSFER_MINOR);
    out
}

/// First index holding the maximum outstanding amount (strict `>` keeps the
/// earliest entry on ties).
fn index_of_largest(entries: &[(usize, i64)]) -> usize {
    let mut best = 0;
    for (idx, entry) in entries.iter().enumerate().skip(1) {
        if entry.1 > entries[best].1 {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(entries: &[(&str, i64)]) -> Vec<(String, i64)> {
        entries
            .iter()
            .map(|(user, net)| (ToString::to_string(user), *net))
            .collect()
    }

    #[test]
    fn largest_debtor_pays_largest_creditor_first() {
        let plan = plan_transfers(&vec_of(&[("a", 300), ("b", -200), ("c", -100)]));
        assert_eq!(
            plan,
            vec![
                SuggestedTransfer {
                    from: "a".to_string(),
                    to: "b".to_string(),
                    amount_minor: 200,
                },
                SuggestedTransfer {
                    from: "a".to_string(),
                    to: "c".to_string(),
                    amount_minor: 100,
                },
            ]
        );
    }

    #[test]
    fn plan_is_deterministic() {
        let balances = vec_of(&[("a", 500), ("b", -250), ("c", 100), ("d", -350)]);
        assert_eq!(plan_transfers(&balances), plan_transfers(&balances));
    }

    #[test]
    fn applying_the_plan_zeroes_all_balances() {
        let mut balances = vec_of(&[("a", 470), ("b", -120), ("c", 80), ("d", -430)]);
        for transfer in plan_transfers(&balances) {
            for (user, net) in balances.iter_mut() {
                if *user == transfer.from {
                    *net -= transfer.amount_minor;
                }
                if *user == transfer.to {
                    *net += transfer.amount_minor;
                }
            }
        }
        assert!(balances.iter().all(|(_, net)| *net == 0));
    }

    #[test]
    fn ties_follow_member_order() {
        let plan = plan_transfers(&vec_of(&[("a", 100), ("b", 100), ("c", -200)]));
        assert_eq!(plan[0].from, "a");
        assert_eq!(plan[1].from, "b");
    }

    #[test]
    fn transfers_below_threshold_are_dropped() {
        let plan = plan_transfers(&vec_of(&[("a", 5), ("b", -5)]));
        assert!(plan.is_empty());
    }

    #[test]
    fn transfer_count_is_bounded() {
        let balances = vec_of(&[("a", 90), ("b", 30), ("c", -40), ("d", -50), ("e", -30)]);
        let plan = plan_transfers(&balances);
        assert!(plan.len() <= balances.len() - 1);
    }

    #[test]
    fn all_zero_balances_yield_no_transfers() {
        assert!(plan_transfers(&vec_of(&[("a", 0), ("b", 0)])).is_empty());
    }
}
