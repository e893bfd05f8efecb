//! # Unit Repository
//!
//! Units of measure are created once and never updated; there is no
//! update or delete operation here.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use super::rows::UnitRow;
use crate::error::{DbError, DbResult};
use tally_core::validation::{validate_decimal_places, validate_unit_code};
use tally_core::{CoreError, NewUnit, UnitOfMeasure};

const UNIT_COLUMNS: &str = "id, code, name, decimal_places";

#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: SqlitePool,
}

impl UnitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UnitRepository { pool }
    }

    /// Creates a unit. Codes are unique.
    pub async fn create(&self, new: &NewUnit) -> DbResult<UnitOfMeasure> {
        validate_unit_code(&new.code)?;
        validate_decimal_places(new.decimal_places)?;
        if new.name.trim().is_empty() {
            return Err(tally_core::ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }

        let unit = UnitOfMeasure {
            id: Uuid::new_v4().to_string(),
            code: new.code.clone(),
            name: new.name.trim().to_string(),
            decimal_places: new.decimal_places,
        };

        debug!(code = %unit.code, decimal_places = unit.decimal_places, "Creating unit");

        sqlx::query("INSERT INTO units (id, code, name, decimal_places) VALUES (?1, ?2, ?3, ?4)")
            .bind(&unit.id)
            .bind(&unit.code)
            .bind(&unit.name)
            .bind(unit.decimal_places as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &unit.code),
                other => other,
            })?;

        Ok(unit)
    }

    pub async fn get(&self, id: &str) -> DbResult<UnitOfMeasure> {
        let row = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| CoreError::UnitNotFound(id.to_string()))?
            .into_domain()
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<UnitOfMeasure>> {
        let row = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UnitRow::into_domain).transpose()
    }

    pub async fn list(&self) -> DbResult<Vec<UnitOfMeasure>> {
        let rows = sqlx::query_as::<_, UnitRow>(&format!(
            "SELECT {UNIT_COLUMNS} FROM units ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UnitRow::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use tally_core::{CoreError, NewUnit};

    fn kg() -> NewUnit {
        NewUnit {
            code: "kg".to_string(),
            name: "Kilogram".to_string(),
            decimal_places: 3,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let unit = db.units().create(&kg()).await.unwrap();

        assert_eq!(db.units().get(&unit.id).await.unwrap(), unit);
        assert_eq!(db.units().get_by_code("kg").await.unwrap(), Some(unit));
        assert_eq!(db.units().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_bad_precision() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.units().create(&kg()).await.unwrap();

        let dup = db.units().create(&kg()).await.unwrap_err();
        assert!(matches!(dup, DbError::UniqueViolation { .. }));

        let mut precise = kg();
        precise.code = "g".to_string();
        precise.decimal_places = 5;
        let err = db.units().create(&precise).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let missing = db.units().get("nope").await.unwrap_err();
        assert!(matches!(missing, DbError::Domain(CoreError::UnitNotFound(_))));
    }
}
