pub use sea_orm_migration::prelude::*;

mod m20260110_000001_init;
mod m20260110_000002_expenses;
mod m20260110_000003_settlements;
mod m20260110_000004_invitations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_init::Migration),
            Box::new(m20260110_000002_expenses::Migration),
            Box::new(m20260110_000003_settlements::Migration),
            Box::new(m20260110_000004_invitations::Migration),
        ]
    }
}
