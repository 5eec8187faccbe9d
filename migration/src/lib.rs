pub use sea_orm_migration::prelude::*;

mod m20241118_000001_create_users_and_classes;
mod m20241118_000002_create_events;
mod m20241118_000003_create_participants;
mod m20241125_000001_create_assignments_and_presents;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241118_000001_create_users_and_classes::Migration),
            Box::new(m20241118_000002_create_events::Migration),
            Box::new(m20241118_000003_create_participants::Migration),
            Box::new(m20241125_000001_create_assignments_and_presents::Migration),
        ]
    }
}
