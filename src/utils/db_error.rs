/// Constraint guarding short ID uniqueness in the `urls` table.
pub const SHORT_ID_CONSTRAINT: &str = "urls_short_id_key";

pub fn is_unique_violation_on(e: &sqlx::Error, constraint: &str) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    db_err.constraint() == Some(constraint)
}

pub fn is_short_id_collision(e: &sqlx::Error) -> bool {
    is_unique_violation_on(e, SHORT_ID_CONSTRAINT)
}
